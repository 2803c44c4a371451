use anyhow::Context;
use rdevsh::config::SessionOptions;
use rdevsh::session::{Credentials, Session, SessionRecordLevel, SessionRecorder};
use std::env;
use std::fs;

fn print_usage() {
    eprintln!(
        "Usage: RDEVSH_HOST=<host> RDEVSH_USER=<user> RDEVSH_PASSWORD=<password> [RDEVSH_SECRET=<enable>] \
         cargo run --example powerconnect_session -- [--telnet] [--record <out.jsonl>] [command...]"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let host = env::var("RDEVSH_HOST").context("RDEVSH_HOST is not set")?;
    let username = env::var("RDEVSH_USER").context("RDEVSH_USER is not set")?;
    let password = env::var("RDEVSH_PASSWORD").context("RDEVSH_PASSWORD is not set")?;
    let mut credentials = Credentials::new(username, password);
    if let Ok(secret) = env::var("RDEVSH_SECRET") {
        credentials = credentials.with_secret(secret);
    }

    let telnet = args.iter().any(|arg| arg == "--telnet");
    let record_path = args
        .iter()
        .position(|arg| arg == "--record")
        .and_then(|idx| args.get(idx + 1))
        .cloned();
    let mut commands: Vec<String> = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "--telnet" => {}
            "--record" => skip_next = true,
            command => commands.push(command.to_string()),
        }
    }
    if commands.is_empty() {
        commands.push("show version".to_string());
    }

    let options = match env::var("RDEVSH_OPTIONS") {
        Ok(path) => {
            let json = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            SessionOptions::from_json_str(&json)?
        }
        Err(_) => SessionOptions::default(),
    };

    let recorder = SessionRecorder::new(SessionRecordLevel::Full);
    let mut session = if telnet {
        Session::connect_telnet(&host, 23, &options).await?
    } else {
        Session::connect_ssh(&host, 22, &credentials, &options).await?
    }
    .with_recorder(recorder.clone());

    session.establish(&credentials).await?;
    println!("session ready at prompt {:?}", session.base_prompt());

    for command in &commands {
        let output = session.send_command(command).await?;
        println!("--- {command}");
        println!("{}", output.content);
    }

    session.close().await?;

    if let Some(path) = record_path {
        fs::write(&path, recorder.to_jsonl()?).with_context(|| format!("writing {path}"))?;
        println!("recording written to {path}");
    }
    Ok(())
}
