// ============================================================================
// gRPC boundary - accounts.v1.AccountService
// ============================================================================
//
// Wire messages live in `pb`; the server trait and router are generated by
// build.rs into OUT_DIR.
//
// ============================================================================

pub mod error_mapper;
pub mod handler;
pub mod pb;
pub mod server;

include!(concat!(env!("OUT_DIR"), "/accounts.v1.AccountService.rs"));

pub use handler::AccountGrpcHandler;
pub use server::serve;
