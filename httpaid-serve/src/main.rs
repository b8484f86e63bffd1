mod config;
mod handler;

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use clap::Parser;
use httpaid::{ErrorLogger, LogMessage};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;

use crate::config::{load_configuration, ServeConfiguration};
use crate::handler::RequestHandler;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// A web server serving canned error pages, redirects and HTTP Basic authentication
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// The path to the server configuration file
  #[arg(short, long, default_value = "./httpaid.kdl")]
  config: PathBuf,

  /// The address to listen on, overriding the configured one
  #[arg(short, long)]
  listen: Option<SocketAddr>,
}

/// Prints the log messages until all the senders are dropped
async fn print_log_messages(log_rx: Receiver<LogMessage>) {
  while let Ok(log_message) = log_rx.recv().await {
    let (message, is_error) = log_message.get_message();
    if is_error {
      eprintln!("{message}");
    } else {
      println!("{message}");
    }
  }
}

async fn serve(
  configuration: ServeConfiguration,
  log_tx: Sender<LogMessage>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
  let listen_address = configuration.listen;
  let error_logger = ErrorLogger::new(log_tx.clone());
  let handler = Arc::new(RequestHandler::new(
    Arc::new(configuration),
    error_logger.clone(),
  ));

  let listener = match TcpListener::bind(listen_address).await {
    Ok(listener) => listener,
    Err(err) => Err(anyhow::anyhow!(
      "Failed to listen at {}: {}",
      listen_address,
      err
    ))?,
  };
  log_tx
    .send(LogMessage::new(
      format!("HTTP server is listening at {listen_address}"),
      false,
    ))
    .await
    .unwrap_or_default();

  loop {
    let (stream, remote_address) = tokio::select! {
      accepted = listener.accept() => match accepted {
        Ok(accepted) => accepted,
        Err(err) => {
          error_logger.log(&format!("Cannot accept a connection: {err}"));
          continue;
        }
      },
      _ = tokio::signal::ctrl_c() => break,
    };

    let handler = handler.clone();
    let error_logger = error_logger.clone();
    tokio::spawn(async move {
      let service = service_fn(move |request| {
        let handler = handler.clone();
        async move { Ok::<_, std::convert::Infallible>(handler.handle(request).await) }
      });
      if let Err(err) = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
      {
        error_logger.log(&format!(
          "Error serving HTTP connection from {remote_address}: {err}"
        ));
      }
    });
  }

  log_tx
    .send(LogMessage::new("HTTP server is shutting down".to_string(), false))
    .await
    .unwrap_or_default();
  Ok(())
}

fn main() {
  let args = Args::parse();

  let mut configuration = match load_configuration(&args.config) {
    Ok(configuration) => configuration,
    Err(err) => {
      eprintln!("Error loading the server configuration: {err}");
      process::exit(1);
    }
  };
  if let Some(listen_address) = args.listen {
    configuration.listen = listen_address;
  }

  let runtime = match tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
  {
    Ok(runtime) => runtime,
    Err(err) => {
      eprintln!("Cannot create the async runtime: {err}");
      process::exit(1);
    }
  };

  let (log_tx, log_rx) = async_channel::unbounded::<LogMessage>();
  let log_task = runtime.spawn(print_log_messages(log_rx));

  let result = runtime.block_on(serve(configuration, log_tx.clone()));
  // The log task ends after printing the messages queued before closing the channel
  log_tx.close();
  runtime.block_on(log_task).unwrap_or_default();

  if let Err(err) = result {
    eprintln!("{err}");
    process::exit(1);
  }
}
