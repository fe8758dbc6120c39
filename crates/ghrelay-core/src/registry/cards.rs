//! Built-in operation cards

use super::documents;
use super::{
    CliConfig, GraphqlConfig, InputField, InputKind, OperationCard, ResolutionSpec, TaskId,
};
use crate::envelope::Route;

fn repo_scoped(card: OperationCard) -> OperationCard {
    card.with_input(InputField::required("owner", InputKind::String))
        .with_input(InputField::required("name", InputKind::String))
}

fn repository_id_resolution() -> ResolutionSpec {
    ResolutionSpec::new("RepositoryIdLookup", documents::REPOSITORY_ID_LOOKUP)
        .bind("owner", "owner")
        .bind("name", "name")
        .inject("id", "repositoryId")
}

fn issue_id_resolution(target: &str) -> ResolutionSpec {
    ResolutionSpec::new("IssueIdLookup", documents::ISSUE_ID_LOOKUP)
        .bind("owner", "owner")
        .bind("name", "name")
        .bind("number", "number")
        .inject("issue.id", target)
}

pub(super) fn builtin_cards() -> Vec<OperationCard> {
    vec![
        repo_scoped(OperationCard::new(TaskId::RepoView, "View repository metadata"))
            .with_routing(Route::Cli, &[Route::Graphql])
            .with_graphql(GraphqlConfig::query("RepoView", documents::REPO_VIEW))
            .with_cli(CliConfig::new("repo view")),
        repo_scoped(OperationCard::new(TaskId::IssueView, "View a single issue"))
            .with_input(InputField::required("number", InputKind::Integer))
            .with_routing(Route::Cli, &[Route::Graphql])
            .with_graphql(GraphqlConfig::query("IssueView", documents::ISSUE_VIEW))
            .with_cli(CliConfig::new("issue view")),
        repo_scoped(OperationCard::new(TaskId::IssueList, "List repository issues"))
            .with_input(InputField::optional("first", InputKind::Integer))
            .with_input(InputField::optional("states", InputKind::StringList))
            .with_routing(Route::Graphql, &[Route::Cli])
            .with_graphql(GraphqlConfig::query("IssueList", documents::ISSUE_LIST))
            .with_cli(CliConfig::new("issue list")),
        repo_scoped(OperationCard::new(
            TaskId::IssueCommentsList,
            "List comments on an issue",
        ))
        .with_input(InputField::required("number", InputKind::Integer))
        .with_input(InputField::optional("first", InputKind::Integer))
        .with_routing(Route::Graphql, &[Route::Rest])
        .with_graphql(GraphqlConfig::query(
            "IssueCommentsList",
            documents::ISSUE_COMMENTS_LIST,
        )),
        repo_scoped(OperationCard::new(TaskId::PrView, "View a single pull request"))
            .with_input(InputField::required("number", InputKind::Integer))
            .with_routing(Route::Cli, &[Route::Graphql])
            .with_graphql(GraphqlConfig::query("PrView", documents::PR_VIEW))
            .with_cli(CliConfig::new("pr view")),
        repo_scoped(OperationCard::new(TaskId::PrList, "List pull requests"))
            .with_input(InputField::optional("first", InputKind::Integer))
            .with_input(InputField::optional("states", InputKind::StringList))
            .with_routing(Route::Graphql, &[Route::Cli])
            .with_graphql(GraphqlConfig::query("PrList", documents::PR_LIST))
            .with_cli(CliConfig::new("pr list")),
        repo_scoped(OperationCard::new(TaskId::IssueCreate, "Create an issue"))
            .with_input(InputField::required("title", InputKind::String))
            .with_input(InputField::optional("body", InputKind::String))
            .with_routing(Route::Graphql, &[Route::Cli])
            .with_graphql(
                GraphqlConfig::mutation("IssueCreate", documents::ISSUE_CREATE)
                    .with_resolution(repository_id_resolution()),
            )
            .with_cli(CliConfig::new("issue create")),
        repo_scoped(OperationCard::new(TaskId::IssueClose, "Close an issue"))
            .with_input(InputField::required("number", InputKind::Integer))
            .with_routing(Route::Graphql, &[Route::Cli])
            .with_graphql(
                GraphqlConfig::mutation("IssueClose", documents::ISSUE_CLOSE)
                    .with_resolution(issue_id_resolution("issueId")),
            )
            .with_cli(CliConfig::new("issue close")),
        repo_scoped(OperationCard::new(
            TaskId::IssueCommentCreate,
            "Comment on an issue",
        ))
        .with_input(InputField::required("number", InputKind::Integer))
        .with_input(InputField::required("body", InputKind::String))
        .with_routing(Route::Graphql, &[Route::Cli])
        .with_graphql(
            GraphqlConfig::mutation("IssueCommentCreate", documents::ISSUE_COMMENT_CREATE)
                .with_resolution(issue_id_resolution("subjectId")),
        )
        .with_cli(CliConfig::new("issue comment")),
    ]
}
