use std::env::var;
use std::sync::mpsc;
use std::time::Duration;

use colored::Colorize;
use httpget::{BoxError, Client, Error, Outcome, RequestPipeline, Response, DEFAULT_PORT};

fn report(request: &RequestPipeline, response: &Response, outcome: &Outcome) {
    match outcome {
        Ok(()) => {
            let status = response.response_line();
            let color = match response.status_code().map(|code| code / 100) {
                Some(1) => "cyan",
                Some(2) => "green",
                Some(3) => "yellow",
                Some(4) => "red",
                Some(5) => "purple",
                _ => "normal",
            };
            eprintln!(
                r#"Request #{} - "GET {}" - {}"#,
                request.id(),
                request.path().bright_cyan(),
                status.color(color),
            );
            println!("{}", response.body_text());
        }
        Err(Error::Aborted) => {
            eprintln!(
                "{}",
                format!("Request #{} has been cancelled by the user.", request.id()).yellow()
            );
        }
        Err(error) => {
            eprintln!(
                "{}",
                format!("Request #{} failed ({}): {}", request.id(), error.kind(), error).red()
            );
        }
    }
}

fn main() -> Result<(), BoxError> {
    env_logger::init();

    let host = var("HTTPGET_HOST").unwrap_or_else(|_| "example.com".to_owned());
    let port = match var("HTTPGET_PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };
    let path = var("HTTPGET_PATH").unwrap_or_else(|_| "/".to_owned());
    let workers = match var("HTTPGET_WORKERS") {
        Ok(workers) => workers.parse::<usize>()?,
        Err(_) => 1,
    };
    let deadline = match var("HTTPGET_DEADLINE_MS") {
        Ok(millis) => Duration::from_millis(millis.parse()?),
        Err(_) => Duration::from_secs(10),
    };

    let client = Client::with_workers(workers)?;
    let request = client.create_request(1);
    request.set_host(host);
    request.set_port(port);
    request.set_path(path);

    let (done, finished) = mpsc::channel();
    request.set_handler(move |request: &RequestPipeline, response: &Response, outcome: &Outcome| {
        report(request, response, outcome);
        let _ = done.send(());
    });
    request.start();

    // the core has no timeout of its own
    if finished.recv_timeout(deadline).is_err() {
        request.cancel();
    }

    client.close();
    Ok(())
}
