use std::sync::Arc;
use tonic::{Code, Request, Response, Status};
use uuid::Uuid;

use super::account_service_server::AccountService as AccountServiceRpc;
use super::error_mapper::ToGrpcStatus;
use super::pb;
use crate::domain::account::{
    Account, AccountDraft, AccountPatch, AccountService, ListFilter, ListQuery, DEFAULT_PAGE_SIZE,
};
use crate::messaging::encoding::to_timestamp;
use crate::metrics::Metrics;

pub struct AccountGrpcHandler {
    service: Arc<AccountService>,
    metrics: Arc<Metrics>,
}

impl AccountGrpcHandler {
    pub fn new(service: Arc<AccountService>, metrics: Arc<Metrics>) -> Self {
        Self { service, metrics }
    }

    fn observe<T>(&self, operation: &str, result: Result<T, Status>) -> Result<T, Status> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(status) => match status.code() {
                Code::InvalidArgument => "invalid_argument",
                Code::NotFound => "not_found",
                Code::AlreadyExists => "already_exists",
                _ => "internal",
            },
        };
        self.metrics.record_operation(operation, outcome);
        result
    }

    async fn create(&self, req: pb::CreateAccountRequest) -> Result<pb::CreateAccountResponse, Status> {
        let draft = AccountDraft {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            handle: req.handle,
            country: req.country,
            password: req.password,
        };

        let id = self.service.create(draft).await.map_grpc()?;

        Ok(pb::CreateAccountResponse {
            account_id: id.to_string(),
        })
    }

    async fn update(&self, req: pb::UpdateAccountRequest) -> Result<pb::UpdateAccountResponse, Status> {
        let id = parse_account_id(&req.account_id)?;
        let fields = req.fields.unwrap_or_default();

        let patch = AccountPatch {
            email: fields.email,
            first_name: fields.first_name,
            last_name: fields.last_name,
            handle: fields.handle,
            country: fields.country,
            password: fields.password,
        };

        self.service.update(id, patch).await.map_grpc()?;

        Ok(pb::UpdateAccountResponse { success: true })
    }

    async fn delete(&self, req: pb::DeleteAccountRequest) -> Result<pb::DeleteAccountResponse, Status> {
        let id = parse_account_id(&req.account_id)?;

        self.service.delete(id).await.map_grpc()?;

        Ok(pb::DeleteAccountResponse { success: true })
    }

    async fn list(&self, req: pb::ListAccountsRequest) -> Result<pb::ListAccountsResponse, Status> {
        let page_number = if req.page_number == 0 { 1 } else { req.page_number };
        let page_size = if req.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            req.page_size
        };

        let filter = req
            .filter
            .map(|f| ListFilter {
                country: non_empty(f.country),
                email: non_empty(f.email),
                handle: non_empty(f.handle),
            })
            .unwrap_or_default();

        let query = ListQuery::new(page_number, page_size).map_grpc()?.with_filter(filter);
        let accounts = self.service.list(query).await.map_grpc()?;

        Ok(pb::ListAccountsResponse {
            accounts: accounts.into_iter().map(pb::AccountInfo::from).collect(),
        })
    }

    async fn get(&self, req: pb::GetAccountRequest) -> Result<pb::GetAccountResponse, Status> {
        let id = parse_account_id(&req.account_id)?;

        let account = self.service.get(id).await.map_grpc()?;

        Ok(pb::GetAccountResponse {
            account: Some(account.into()),
        })
    }
}

#[tonic::async_trait]
impl AccountServiceRpc for AccountGrpcHandler {
    async fn create_account(
        &self,
        request: Request<pb::CreateAccountRequest>,
    ) -> Result<Response<pb::CreateAccountResponse>, Status> {
        let result = self.create(request.into_inner()).await;
        self.observe("create", result).map(Response::new)
    }

    async fn update_account(
        &self,
        request: Request<pb::UpdateAccountRequest>,
    ) -> Result<Response<pb::UpdateAccountResponse>, Status> {
        let result = self.update(request.into_inner()).await;
        self.observe("update", result).map(Response::new)
    }

    async fn delete_account(
        &self,
        request: Request<pb::DeleteAccountRequest>,
    ) -> Result<Response<pb::DeleteAccountResponse>, Status> {
        let result = self.delete(request.into_inner()).await;
        self.observe("delete", result).map(Response::new)
    }

    async fn list_accounts(
        &self,
        request: Request<pb::ListAccountsRequest>,
    ) -> Result<Response<pb::ListAccountsResponse>, Status> {
        let result = self.list(request.into_inner()).await;
        self.observe("list", result).map(Response::new)
    }

    async fn get_account(
        &self,
        request: Request<pb::GetAccountRequest>,
    ) -> Result<Response<pb::GetAccountResponse>, Status> {
        let result = self.get(request.into_inner()).await;
        self.observe("get", result).map(Response::new)
    }
}

fn parse_account_id(raw: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(raw).map_err(|_| Status::invalid_argument(format!("invalid account id: {:?}", raw)))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<Account> for pb::AccountInfo {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id.to_string(),
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            handle: account.handle,
            country: account.country,
            credential: account.credential.as_str().to_string(),
            created_at: Some(to_timestamp(account.created_at)),
            updated_at: account.updated_at.map(to_timestamp),
        }
    }
}
