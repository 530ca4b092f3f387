use dotenvy::dotenv;
use salvo::conn::rustls::{Keycert, RustlsConfig};
use salvo::logging::Logger;
use salvo::prelude::*;
use tracing_futures::Instrument;

use fedmock::{HandlerRegistry, KeyCache, config, logging, tls};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = dotenv() {
        tracing::info!("dotenv error: {:?}", e);
    }

    config::init();
    let conf = config::get();
    logging::init(&conf.logger)?;

    let identity = conf.identity()?;
    tracing::info!(server_name = %identity.name(), key_id = %identity.key_id(), "federating as");

    let (_client, server) = fedmock::configure(
        identity,
        KeyCache::new(),
        conf.federation_settings(),
        HandlerRegistry::new(),
    )?;

    println!("Listening on {}", conf.listen_addr);
    if let Some(tls_conf) = &conf.tls {
        let server = server.with_certificate(&tls::load_certificate(&tls_conf.cert)?);
        let service = server.service().hoop(Logger::new());
        let rustls = RustlsConfig::new(
            Keycert::new()
                .cert_from_path(&tls_conf.cert)?
                .key_from_path(&tls_conf.key)?,
        );
        let acceptor = TcpListener::new(conf.listen_addr.as_str()).rustls(rustls).bind().await;
        Server::new(acceptor)
            .serve(service)
            .instrument(tracing::info_span!("server.serve"))
            .await
    } else {
        let service = server.service().hoop(Logger::new());
        let acceptor = TcpListener::new(conf.listen_addr.as_str()).bind().await;
        Server::new(acceptor)
            .serve(service)
            .instrument(tracing::info_span!("server.serve"))
            .await
    };
    Ok(())
}
