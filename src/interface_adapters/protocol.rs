use crate::domain::entities::User;
use serde::{Deserialize, Serialize};

// Request for creating a user; `user` comes from the body, `opt` from the query.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub user: Option<User>,
    pub opt: String,
}

// Response echoing the created user and option.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: Option<User>,
    pub opt: String,
}

// Request for listing users filtered by name.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListUsersRequest {
    pub name: String,
}

// Response payload for user listing.
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
}

// Request for a single user, keyed by the `{id}` path segment.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub id: String,
}

// Response payload for a single user.
#[derive(Debug, Serialize)]
pub struct GetUserResponse {
    pub user: User,
}

// Error envelope for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
