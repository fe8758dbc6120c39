//! Built-in GraphQL documents
//!
//! Each document holds one operation with a single root field so the batch
//! compiler can alias it.

/// `repo.view`
pub const REPO_VIEW: &str = r#"query RepoView($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    name
    nameWithOwner
    description
    url
    isPrivate
    isArchived
    stargazerCount
    forkCount
    defaultBranchRef { name }
  }
}"#;

/// `issue.view`
pub const ISSUE_VIEW: &str = r#"query IssueView($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      id
      number
      title
      state
      body
      url
      author { login }
      labels(first: 20) { nodes { name } }
    }
  }
}"#;

/// `issue.list`
pub const ISSUE_LIST: &str = r#"query IssueList($owner: String!, $name: String!, $first: Int = 30, $states: [IssueState!]) {
  repository(owner: $owner, name: $name) {
    issues(first: $first, states: $states, orderBy: { field: CREATED_AT, direction: DESC }) {
      nodes { number title state url }
    }
  }
}"#;

/// `issue.comments.list`
pub const ISSUE_COMMENTS_LIST: &str = r#"query IssueCommentsList($owner: String!, $name: String!, $number: Int!, $first: Int = 30) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: $first) {
        nodes { id body url createdAt author { login } }
      }
    }
  }
}"#;

/// `pr.view`
pub const PR_VIEW: &str = r#"query PrView($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      id
      number
      title
      state
      isDraft
      url
      headRefName
      baseRefName
      mergeable
    }
  }
}"#;

/// `pr.list`
pub const PR_LIST: &str = r#"query PrList($owner: String!, $name: String!, $first: Int = 30, $states: [PullRequestState!]) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: $first, states: $states, orderBy: { field: CREATED_AT, direction: DESC }) {
      nodes { number title state url headRefName }
    }
  }
}"#;

/// `issue.create`
pub const ISSUE_CREATE: &str = r#"mutation IssueCreate($repositoryId: ID!, $title: String!, $body: String) {
  createIssue(input: { repositoryId: $repositoryId, title: $title, body: $body }) {
    issue { id number title url }
  }
}"#;

/// `issue.close`
pub const ISSUE_CLOSE: &str = r#"mutation IssueClose($issueId: ID!) {
  closeIssue(input: { issueId: $issueId }) {
    issue { id number state }
  }
}"#;

/// `issue.comment.create`
pub const ISSUE_COMMENT_CREATE: &str = r#"mutation IssueCommentCreate($subjectId: ID!, $body: String!) {
  addComment(input: { subjectId: $subjectId, body: $body }) {
    commentEdge { node { id url } }
  }
}"#;

/// Lookup: repository node id
pub const REPOSITORY_ID_LOOKUP: &str = r#"query RepositoryIdLookup($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) { id }
}"#;

/// Lookup: issue node id
pub const ISSUE_ID_LOOKUP: &str = r#"query IssueIdLookup($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) { id }
  }
}"#;
