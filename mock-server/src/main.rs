use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;

/// Serves the test routes on `127.0.0.1:$PORT`. `PORT=0` picks a free port,
/// which is printed once bound.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("PORT={raw}: {e}"))
        })?,
        Err(_) => 3000,
    };
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await?;
    println!("mock server listening on http://{}", listener.local_addr()?);
    mock_server::run(listener).await
}
