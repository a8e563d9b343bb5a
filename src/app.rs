use crate::config::{AppConfig, HTTPConfig};
use crate::http::create_app;
use crate::relay::Relay;
use crate::upstream::build_client;
use crate::verifier::WebhookVerifier;
use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct AppHandles {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}
impl AppHandles {
    pub async fn new(config: AppConfig) -> Result<AppHandles> {
        let client = build_client(&config.upstream)?;
        let relay = Relay::from_config(&config, client);
        let verifier = WebhookVerifier::new(config.credentials.verify_token.clone());

        let http_handle = Self::start_http_server(config.http, relay, verifier)?;
        Ok(AppHandles {
            tasks: vec![("HTTP Server", http_handle)],
        })
    }

    /// Runs until any task ends or the process receives Ctrl-C.
    pub async fn run(self) {
        let futures: Vec<_> = self
            .tasks
            .into_iter()
            .map(|(name, handle)| {
                info!("Starting task: {name}");
                Box::pin(async move {
                    match handle.await {
                        Ok(_) => error!("{name} task completed!"),
                        Err(e) => error!("{name} task failed: {e:?}!"),
                    }
                })
            })
            .collect();

        tokio::select! {
            (_, _, remaining) = futures::future::select_all(futures) => drop(remaining),
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
            },
        }
    }

    fn start_http_server(
        config: HTTPConfig,
        relay: Relay,
        verifier: WebhookVerifier,
    ) -> Result<JoinHandle<()>> {
        let address = config.address;
        let app = create_app(relay, verifier);

        let handle = tokio::spawn(async move {
            let result = match config.tls {
                Some(_tls_config) => {
                    #[cfg(any(feature = "tls-rustls", feature = "tls-native"))]
                    {
                        info!("Starting HTTPS (secure) server on {address}");
                        info!("Webhook endpoint: https://{address}/webhook");

                        #[cfg(feature = "tls-rustls")]
                        {
                            let _ = rustls::crypto::CryptoProvider::install_default(
                                rustls::crypto::aws_lc_rs::default_provider(),
                            );
                            match axum_server::tls_rustls::RustlsConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            )
                            .await
                            {
                                Ok(tls) => axum_server::bind_rustls(address, tls)
                                    .serve(app.into_make_service())
                                    .await
                                    .map_err(anyhow::Error::from),
                                Err(e) => Err(anyhow::anyhow!(
                                    "Failed to load rustls TLS certificates: {e}"
                                )),
                            }
                        }

                        #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
                        {
                            match axum_server::tls_openssl::OpenSSLConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            ) {
                                Ok(tls) => axum_server::bind_openssl(address, tls)
                                    .serve(app.into_make_service())
                                    .await
                                    .map_err(anyhow::Error::from),
                                Err(e) => Err(anyhow::anyhow!(
                                    "Failed to load openssl TLS certificates: {e}"
                                )),
                            }
                        }
                    }

                    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
                    Err(anyhow::anyhow!(
                        "HTTP Server TLS configuration provided but no TLS features enabled. Compile with a TLS backend feature!"
                    ))
                }
                None => {
                    info!("Starting HTTP (insecure) server on {address}");
                    info!("Webhook endpoint: http://{address}/webhook");
                    axum_server::bind(address)
                        .serve(app.into_make_service())
                        .await
                        .map_err(anyhow::Error::from)
                }
            };

            if let Err(e) = result {
                error!("Server error: {e:?}");
            }
        });

        Ok(handle)
    }
}
