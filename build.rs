use tonic_build::manual::{Builder, Method, Service};

// ============================================================================
// gRPC service codegen
// ============================================================================
//
// The request/response messages are hand-written prost structs living in
// src/grpc/pb.rs, so the service is described here in Rust instead of a
// .proto file. Output lands in OUT_DIR as `accounts.v1.AccountService.rs`.
//
// ============================================================================

fn unary(name: &str, route: &str, input: &str, output: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::grpc::pb::{}", input))
        .output_type(format!("crate::grpc::pb::{}", output))
        .codec_path("tonic_prost::ProstCodec")
        .build()
}

fn main() {
    let service = Service::builder()
        .name("AccountService")
        .package("accounts.v1")
        .method(unary("create_account", "CreateAccount", "CreateAccountRequest", "CreateAccountResponse"))
        .method(unary("update_account", "UpdateAccount", "UpdateAccountRequest", "UpdateAccountResponse"))
        .method(unary("delete_account", "DeleteAccount", "DeleteAccountRequest", "DeleteAccountResponse"))
        .method(unary("list_accounts", "ListAccounts", "ListAccountsRequest", "ListAccountsResponse"))
        .method(unary("get_account", "GetAccount", "GetAccountRequest", "GetAccountResponse"))
        .build();

    Builder::new()
        .build_client(false)
        .build_server(true)
        .compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
