use crate::domain::UserError;
use crate::interface_adapters::context::Context;
use crate::interface_adapters::errors::ApiError;
use crate::interface_adapters::protocol::{
    CreateUserRequest, CreateUserResponse, GetUserRequest, GetUserResponse, ListUsersRequest,
    ListUsersResponse,
};
use crate::interface_adapters::state::AppState;
use axum::http::StatusCode;
use std::convert::Infallible;
use std::sync::Arc;

// Create a user from the JSON body, echoing the `opt` query parameter.
#[tracing::instrument(name = "create_user", skip_all, fields(opt = %req.opt))]
pub async fn create_user(
    ctx: Context<Arc<AppState>>,
    req: CreateUserRequest,
) -> Result<CreateUserResponse, Infallible> {
    let user = ctx.state.users.create_user(req.user);

    Ok(CreateUserResponse { user, opt: req.opt })
}

#[tracing::instrument(name = "list_users", skip_all, fields(name = %req.name))]
pub async fn list_users(
    ctx: Context<Arc<AppState>>,
    req: ListUsersRequest,
) -> Result<ListUsersResponse, Infallible> {
    let users = ctx.state.users.list_users(&req.name);

    Ok(ListUsersResponse { users })
}

#[tracing::instrument(name = "get_user", skip_all, fields(id = %req.id))]
pub async fn get_user(
    ctx: Context<Arc<AppState>>,
    req: GetUserRequest,
) -> Result<GetUserResponse, ApiError> {
    let user = ctx.state.users.get_user(&req.id).map_err(map_user_error)?;

    Ok(GetUserResponse { user })
}

fn map_user_error(err: UserError) -> ApiError {
    match err {
        UserError::NotFound { ref id } => {
            tracing::debug!(%id, "user lookup missed");
            ApiError::new(StatusCode::NOT_FOUND, err.to_string())
        }
    }
}
