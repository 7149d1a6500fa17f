use tonic::Status;

use crate::domain::account::AccountError;

pub trait ToGrpcStatus<T> {
    fn map_grpc(self) -> Result<T, Status>;
}

impl<T> ToGrpcStatus<T> for Result<T, AccountError> {
    fn map_grpc(self) -> Result<T, Status> {
        self.map_err(|e| match e {
            AccountError::ValidationFailure(reason) => Status::invalid_argument(reason),

            AccountError::AccountNotFound(id) => Status::not_found(format!("account '{}' not found", id)),

            AccountError::EmailAlreadyInUse => Status::already_exists("email is already in use"),

            // Causes stay in the logs, never on the wire
            other => {
                tracing::error!(error = %other, "Account operation failed");
                Status::internal("internal server error")
            }
        })
    }
}
