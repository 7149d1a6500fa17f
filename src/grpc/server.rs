use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tonic::transport::Server;

use super::account_service_server::AccountServiceServer;
use super::handler::AccountGrpcHandler;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve the account API plus the standard health service until `shutdown`
/// resolves. In-flight requests are allowed to finish.
pub async fn serve<S>(addr: SocketAddr, handler: AccountGrpcHandler, shutdown: S) -> Result<(), tonic::transport::Error>
where
    S: Future<Output = ()> + Send,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AccountServiceServer<AccountGrpcHandler>>()
        .await;

    tracing::info!("🚀 gRPC server listening on {}", addr);

    Server::builder()
        .timeout(REQUEST_TIMEOUT)
        .add_service(health_service)
        .add_service(AccountServiceServer::new(handler))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}
