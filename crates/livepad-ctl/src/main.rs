//! livepad-ctl — command-line client for LivePad target processes.

use anyhow::{Context, Result};

use livepad_client::{discovery, render, transport, CodeKind};
use livepad_core::config::LivepadConfig;
use livepad_core::dump::{DumpType, DumpValue, ExecuteResponse};
use livepad_core::protocol::{parse_exception_message, CMD_GET_RUNTIME_INFO, CMD_WHO_ARE_YOU};

// ── Subcommand handlers ──────────────────────────────────────────────────────

async fn cmd_discover(config: &LivepadConfig) -> Result<()> {
    println!("Pinging {} ...", config.discovery.broadcast_addr);
    let pads = discovery::discover(&config.discovery).await;

    if pads.is_empty() {
        println!("No LivePad servers found.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Discovered Servers ({})", pads.len());
    println!("═══════════════════════════════════════");
    for pad in &pads {
        println!("  ┌─ {}", pad.service_name);
        println!("  └─ {}", pad.callback_address);
    }
    Ok(())
}

async fn cmd_who(target: &str) -> Result<()> {
    let name = transport::send_custom_command(target, CMD_WHO_ARE_YOU)
        .await
        .with_context(|| format!("failed to reach {target} — is the server running?"))?;
    println!("{name}");
    Ok(())
}

async fn cmd_info(target: &str) -> Result<()> {
    let info = transport::send_custom_command(target, CMD_GET_RUNTIME_INFO)
        .await
        .with_context(|| format!("failed to reach {target} — is the server running?"))?;
    println!("{info}");
    Ok(())
}

async fn cmd_run(
    target: &str,
    file: &str,
    kind: CodeKind,
    html_out: Option<&str>,
    config: &LivepadConfig,
) -> Result<()> {
    let src = std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?;
    let response = livepad_client::run_snippet(target, &src, kind, &config.snippet)
        .await
        .context("snippet run failed")?;

    print_response(&response);

    if let Some(path) = html_out {
        std::fs::write(path, render::to_html(&response))
            .with_context(|| format!("failed to write {path}"))?;
        println!("(html written to {path})");
    }
    Ok(())
}

async fn cmd_send(target: &str, command: &str, body_file: Option<&str>) -> Result<()> {
    let response = match body_file {
        Some(path) => {
            let body =
                std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
            transport::post(target, command, &body).await?
        }
        None => transport::send_custom_command(target, command).await?,
    };
    println!("{response}");
    Ok(())
}

// ── Result tree printing ─────────────────────────────────────────────────────

fn print_response(response: &ExecuteResponse) {
    if let Some(error) = &response.error_message {
        match parse_exception_message(error) {
            Some((offset, message)) => {
                eprintln!("Execution failed at source offset {offset}: {message}");
            }
            None => eprintln!("Execution failed: {error}"),
        }
        return;
    }

    let results = response.results.as_deref().unwrap_or_default();
    if results.is_empty() {
        println!("(no dumps)");
        return;
    }
    for pair in results {
        println!("── {}", pair.result_key);
        match &pair.result_value {
            Some(node) => print_node(node, 1),
            None => println!("   null"),
        }
    }
}

fn print_node(node: &DumpValue, depth: usize) {
    let pad = "   ".repeat(depth);
    let type_name = node.type_name.as_deref().unwrap_or("?");
    match node.dump_type {
        DumpType::Primitive => {
            println!("{pad}{} ({type_name})", scalar_text(node.primitive_value.as_ref()));
        }
        DumpType::PrimitiveSequence => {
            let rendered: Vec<String> = node
                .primitive_enumerable
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|v| scalar_text(Some(v)))
                .collect();
            println!("{pad}[{}] ({type_name})", rendered.join(", "));
        }
        DumpType::Complex => {
            println!("{pad}{type_name}");
            if let Some(fields) = &node.complex_value {
                for (name, child) in fields.iter() {
                    println!("{pad}  {name}:");
                    print_node(child, depth + 2);
                }
            }
        }
        DumpType::ComplexSequence => {
            let items = node.complex_enumerable.as_deref().unwrap_or_default();
            println!("{pad}{type_name} [{} items]", items.len());
            for child in items {
                print_node(child, depth + 1);
            }
        }
        DumpType::BeyondDepthLimit => println!("{pad}{type_name} …"),
        DumpType::Image => {
            let size = node
                .primitive_value
                .as_ref()
                .and_then(|v| v.as_str())
                .map(|s| s.len())
                .unwrap_or(0);
            println!("{pad}<jpeg image, {size} base64 chars>");
        }
    }
}

fn scalar_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "null".to_string(),
    }
}

fn print_usage() {
    println!("Usage: livepad-ctl <command> [options]");
    println!();
    println!("Commands:");
    println!("  discover                    Ping the subnet and list live servers");
    println!("  who <target>                Ask a server to identify itself");
    println!("  info <target>               Show the server's runtime library version");
    println!("  run <target> <file.rs>      Compile and execute a snippet file");
    println!("  send <target> <command>     Send a custom command (optional --body <file>)");
    println!();
    println!("Options:");
    println!("  --expr          Treat the snippet as a single expression");
    println!("  --html <path>   Also write the result tree as HTML");
    println!("  --body <path>   Body file for `send`");
    println!();
    println!("A <target> is a callback address like http://192.168.1.20:8080/");
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = LivepadConfig::load().unwrap_or_default();
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Pull out flags, keep positionals.
    let mut expr = false;
    let mut html_out: Option<String> = None;
    let mut body_file: Option<String> = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--expr" => expr = true,
            "--html" => {
                i += 1;
                html_out = Some(args.get(i).context("--html requires a path")?.clone());
            }
            "--body" => {
                i += 1;
                body_file = Some(args.get(i).context("--body requires a path")?.clone());
            }
            other => positional.push(other),
        }
        i += 1;
    }

    let kind = if expr {
        CodeKind::Expression
    } else {
        CodeKind::Statements
    };

    match positional.as_slice() {
        ["discover"] => cmd_discover(&config).await,
        ["who", target] => cmd_who(target).await,
        ["info", target] => cmd_info(target).await,
        ["run", target, file] => cmd_run(target, file, kind, html_out.as_deref(), &config).await,
        ["send", target, command] => cmd_send(target, command, body_file.as_deref()).await,
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
