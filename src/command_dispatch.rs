//! Purpose: Hold top-level CLI command dispatch for `mqbridge`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and run the producer/consumer flows.
//! Invariants: Every session that reached `Ready` is shut down before the command returns.
//! Invariants: A shutdown failure is reported unless an earlier error already is.

use super::*;

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mqbridge::api::{
    ConsumeLoop, ConsumeOptions, ConsumerParams, ConsumerSession, ProducerParams, ProducerSession,
    SendOutcome,
};
use serde::Serialize;
use signal_hook::consts::{SIGINT, SIGTERM};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

pub(super) fn dispatch_command(command: Command, library: PathBuf) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "mqbridge", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Produce {
            broker,
            tag,
            bodies,
        } => produce(library, broker, tag, bodies),
        Command::Consume {
            broker,
            tag,
            timeout_ms,
            idle_ms,
            count,
            raw,
        } => {
            let options = ConsumeOptions {
                poll_timeout: millis(timeout_ms),
                idle_interval: millis(idle_ms),
                max_messages: count,
                ..ConsumeOptions::default()
            };
            consume(library, broker, tag, options, raw)
        }
    }
}

fn produce(
    library: PathBuf,
    broker: BrokerArgs,
    tag: String,
    bodies: Vec<String>,
) -> Result<RunOutcome, Error> {
    let mut producer = ProducerSession::new(library);
    let status = producer.initialize(&ProducerParams::new(broker.name_server, broker.group))?;
    info!(?status, topic = %broker.topic, "producer ready");

    let sent = send_bodies(&mut producer, &broker.topic, &tag, bodies);
    let declined = finish(sent, producer.shutdown())?;
    if declined > 0 {
        warn!(declined, "some messages were not accepted");
        return Ok(RunOutcome::with_code(1));
    }
    Ok(RunOutcome::ok())
}

fn send_bodies(
    producer: &mut ProducerSession,
    topic: &str,
    tag: &str,
    bodies: Vec<String>,
) -> Result<u64, Error> {
    let mut out = io::stdout().lock();
    let mut declined = 0;
    let mut send_one = |body: &str| -> Result<(), Error> {
        let outcome = producer.send(topic, tag, body)?;
        if !outcome.success {
            declined += 1;
        }
        write_line(&mut out, &SendRecord::from(&outcome))
    };

    if bodies.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            if line.trim().is_empty() {
                continue;
            }
            send_one(&line)?;
        }
    } else {
        for body in &bodies {
            send_one(body)?;
        }
    }
    Ok(declined)
}

fn consume(
    library: PathBuf,
    broker: BrokerArgs,
    tag: String,
    options: ConsumeOptions,
    raw: bool,
) -> Result<RunOutcome, Error> {
    let stop = Arc::new(AtomicBool::new(false));
    register_stop_signals(&stop)?;

    let mut consumer = ConsumerSession::new(library);
    let params = ConsumerParams::new(broker.name_server, broker.topic.clone(), broker.group, tag);
    let status = consumer.initialize(&params)?;
    info!(?status, topic = %broker.topic, "consumer ready; waiting for messages");

    let mut out = io::stdout().lock();
    let mut write_error: Option<Error> = None;
    let consumed = ConsumeLoop::new(options).run(
        &mut consumer,
        |body| {
            if write_error.is_some() {
                return;
            }
            if let Err(err) = emit_message(&mut out, body, raw) {
                write_error = Some(err);
                stop.store(true, Ordering::Release);
            }
        },
        &stop,
    );

    let stats = finish(consumed, consumer.shutdown())?;
    if let Some(err) = write_error {
        return Err(err);
    }
    info!(
        delivered = stats.delivered,
        polls = stats.polls,
        errors = stats.errors,
        "consumer stopped"
    );
    Ok(RunOutcome::ok())
}

/// First SIGINT/SIGTERM requests a stop; a second SIGINT exits right away.
fn register_stop_signals(stop: &Arc<AtomicBool>) -> Result<(), Error> {
    let install = |err: io::Error| {
        Error::new(ErrorKind::Io)
            .with_message("failed to install signal handler")
            .with_source(err)
    };
    signal_hook::flag::register_conditional_shutdown(SIGINT, 130, Arc::clone(stop))
        .map_err(install)?;
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(stop)).map_err(install)?;
    }
    Ok(())
}

fn finish<T>(outcome: Result<T, Error>, shutdown: Result<(), Error>) -> Result<T, Error> {
    match (outcome, shutdown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(shutdown_err)) => {
            warn!(error = %shutdown_err, "shutdown after failure also failed");
            Err(err)
        }
    }
}

#[derive(Serialize)]
struct SendRecord<'a> {
    success: bool,
    raw: &'a str,
    msg_id: Option<&'a str>,
}

impl<'a> From<&'a SendOutcome> for SendRecord<'a> {
    fn from(outcome: &'a SendOutcome) -> Self {
        Self {
            success: outcome.success,
            raw: &outcome.raw_message,
            msg_id: outcome.message_id(),
        }
    }
}

#[derive(Serialize)]
struct MessageRecord<'a> {
    time: String,
    body: &'a str,
}

fn emit_message(out: &mut impl Write, body: &str, raw: bool) -> Result<(), Error> {
    if raw {
        return write_raw(out, body);
    }
    let record = MessageRecord {
        time: received_at()?,
        body,
    };
    write_line(out, &record)
}

fn received_at() -> Result<String, Error> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("timestamp format failed")
            .with_source(err)
    })
}

fn write_line(out: &mut impl Write, value: &impl Serialize) -> Result<(), Error> {
    let line = serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize output")
            .with_source(err)
    })?;
    write_raw(out, &line)
}

fn write_raw(out: &mut impl Write, line: &str) -> Result<(), Error> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write stdout")
                .with_source(err)
        })
}
