use prost_types::Timestamp;

// ============================================================================
// accounts.v1 wire messages
// ============================================================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateAccountRequest {
    #[prost(string, tag = "1")]
    pub email: String,
    #[prost(string, tag = "2")]
    pub first_name: String,
    #[prost(string, tag = "3")]
    pub last_name: String,
    #[prost(string, tag = "4")]
    pub handle: String,
    #[prost(string, tag = "5")]
    pub country: String,
    #[prost(string, tag = "6")]
    pub password: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateAccountResponse {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

/// Fields to change. Unset fields are left as they are.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountFields {
    #[prost(string, optional, tag = "1")]
    pub email: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub first_name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub last_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub handle: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub country: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub password: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateAccountRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(message, optional, tag = "2")]
    pub fields: Option<AccountFields>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateAccountResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteAccountRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteAccountResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListFilter {
    #[prost(string, tag = "1")]
    pub country: String,
    #[prost(string, tag = "2")]
    pub email: String,
    #[prost(string, tag = "3")]
    pub handle: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListAccountsRequest {
    /// One-based; 0 means the first page
    #[prost(uint64, tag = "1")]
    pub page_number: u64,
    /// 0 means the default page size
    #[prost(uint64, tag = "2")]
    pub page_size: u64,
    #[prost(message, optional, tag = "3")]
    pub filter: Option<ListFilter>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AccountInfo {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub email: String,
    #[prost(string, tag = "3")]
    pub first_name: String,
    #[prost(string, tag = "4")]
    pub last_name: String,
    #[prost(string, tag = "5")]
    pub handle: String,
    #[prost(string, tag = "6")]
    pub country: String,
    /// argon2 PHC string
    #[prost(string, tag = "7")]
    pub credential: String,
    #[prost(message, optional, tag = "8")]
    pub created_at: Option<Timestamp>,
    #[prost(message, optional, tag = "9")]
    pub updated_at: Option<Timestamp>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListAccountsResponse {
    #[prost(message, repeated, tag = "1")]
    pub accounts: Vec<AccountInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountRequest {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountInfo>,
}
