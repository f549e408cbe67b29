use anyhow::Result;
use burgerbot::api::ApiClient;
use burgerbot::config::Config;
use burgerbot::observability::init_logging;
use burgerbot::state::{ChatSession, OrderBook};
use burgerbot::types::StreamEvent;
use crossterm::style::Stylize;
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const CONNECTION_FAILED_TEXT: &str = "죄송합니다. 서버 연결에 문제가 발생했습니다.";

enum Command<'a> {
    Quit,
    Orders,
    Clear,
    NewSession,
    Message(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let trimmed = line.trim();
    match trimmed {
        "" => None,
        "/quit" | "/exit" => Some(Command::Quit),
        "/orders" => Some(Command::Orders),
        "/clear" => Some(Command::Clear),
        "/new" => Some(Command::NewSession),
        _ => Some(Command::Message(trimmed)),
    }
}

fn print_event(event: &StreamEvent) -> io::Result<()> {
    let mut stdout = io::stdout();
    match event {
        StreamEvent::Delta { text } => write!(stdout, "{text}")?,
        StreamEvent::Complete { summary } => {
            writeln!(stdout)?;
            if !summary.trim().is_empty() {
                writeln!(stdout, "{}", format!("[주문] {summary}").dark_grey())?;
            }
        }
        StreamEvent::Error { message } => {
            writeln!(stdout)?;
            writeln!(
                stdout,
                "{}",
                format!("죄송합니다. 오류가 발생했습니다: {message}").red()
            )?;
        }
    }
    stdout.flush()
}

fn print_orders(orders: &OrderBook) {
    println!("{}", orders.summary().bold());
    for line in orders.lines() {
        let parts: Vec<&str> = [line.burger.as_str(), line.side.as_str(), line.drink.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        println!("  {} x{} ({})", parts.join(" + "), line.quantity, line.kind);
    }
}

/// Next prompt line. `None` on end of input or when `interrupt` fires first.
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

async fn run_message(session: &mut ChatSession, message: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = {
        let turn = session.send(message, &cancel, Some(&tx));
        tokio::pin!(turn);
        loop {
            tokio::select! {
                result = &mut turn => break result,
                Some(event) = rx.recv() => print_event(&event)?,
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
            }
        }
    };
    while let Ok(event) = rx.try_recv() {
        print_event(&event)?;
    }

    match result {
        Ok(outcome) if outcome.cancelled => println!("\n{}", "(중단됨)".dark_grey()),
        Ok(outcome) if outcome.order_summary.is_none() && outcome.error.is_none() => println!(),
        Ok(_) => {}
        Err(error) => {
            tracing::error!(%error, "chat turn failed");
            println!("{}", CONNECTION_FAILED_TEXT.red());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    config.validate()?;

    let client = ApiClient::new(&config)?;
    let mut session =
        ChatSession::new(client, config.session_id.clone()).with_streaming(config.streaming);

    match session.start().await {
        Ok(Some(greeting)) => println!("{greeting}"),
        Ok(None) => {}
        Err(error) => tracing::error!(%error, "session initialisation failed"),
    }
    println!(
        "{}",
        format!(
            "session {} · /orders /clear /new /quit",
            session.session_id()
        )
        .dark_grey()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold());
        io::stdout().flush()?;

        // Once a turn has listened for Ctrl-C the default handler is gone, so the prompt
        // has to listen too.
        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Orders => match session.refresh_orders().await {
                Ok(orders) => print_orders(orders),
                Err(error) => println!("{}", format!("주문 조회 중 오류가 발생했습니다: {error}").red()),
            },
            Command::Clear => match session.clear_orders().await {
                Ok(message) if !message.is_empty() => println!("{message}"),
                Ok(_) => println!("주문 내역을 초기화했습니다."),
                Err(error) => println!("{}", format!("주문 초기화 중 오류가 발생했습니다: {error}").red()),
            },
            Command::NewSession => match session.start().await {
                Ok(greeting) => println!("{}", greeting.unwrap_or_default()),
                Err(error) => println!("{}", format!("{error}").red()),
            },
            Command::Message(message) => run_message(&mut session, message).await?,
        }
    }

    Ok(())
}
