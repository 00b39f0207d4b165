//! Interactive calculator front end.
//!
//! Reads keypad input line by line, drives the engine and keeps local
//! history synchronized with the backend when a token is configured.

use std::io::{BufRead, Write as _};

use chrono::{Datelike, Local};
use engine::{Calculator, ForcingRule, Operator, format_value};

use prestidigit_cli::{
    client::Client,
    config,
    error::{AppError, Result},
    local_store::LocalStore,
    sync::{Remote, Synchronizer},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prestidigit_cli=info".into()),
        )
        .init();

    let settings = config::load()?;
    let store = LocalStore::new(settings.state_dir.as_str());

    let remote = if settings.token.is_empty() {
        None
    } else {
        Some(Remote {
            client: Client::new(&settings.base_url)?,
            token: settings.token.clone(),
        })
    };

    let mut calculator = Calculator::new(settings.calculator_config());
    let mut synchronizer = Synchronizer::open(store.clone(), remote.clone())?;

    // The remote profile wins over the locally saved rule when reachable;
    // offline the last saved rule applies.
    let mut rule = store.load_rule()?;
    if let Some(remote) = &remote {
        match remote.client.me(&remote.token).await {
            Ok(profile) => {
                rule = ForcingRule {
                    forced_number: profile.forced_number,
                    second_force_number: profile.second_force_number,
                    second_force_trigger_number: profile.second_force_trigger_number,
                };
                store.save_rule(&rule)?;
            }
            Err(err) => tracing::warn!("profile fetch failed, using local rule: {err}"),
        }
    }
    calculator.set_rule(rule);

    synchronizer.sync().await?;

    println!("prestidigit calculator (type 'help' for commands)");
    print_display(&calculator);

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit") {
            break;
        }

        if let Err(err) = handle_input(input, &mut calculator, &mut synchronizer, &store).await {
            eprintln!("error: {err}");
        }
    }

    synchronizer.sync().await?;
    Ok(())
}

fn print_display(calculator: &Calculator) {
    println!("{}", calculator.display());
}

async fn handle_input(
    input: &str,
    calculator: &mut Calculator,
    synchronizer: &mut Synchronizer,
    store: &LocalStore,
) -> Result<()> {
    match input {
        "help" => {
            print_help();
            return Ok(());
        }
        "=" => {
            if let Some(entry) = calculator.press_equals() {
                synchronizer.append(entry)?;
                synchronizer.sync().await?;
            }
        }
        "age" => {
            if let Some(entry) = calculator.age_from_year(Local::now().year()) {
                synchronizer.append(entry)?;
                synchronizer.sync().await?;
            } else {
                eprintln!("display is not a plausible birth year");
            }
        }
        "." => calculator.press_decimal(),
        "%" => calculator.press_percent(),
        "sign" => calculator.press_toggle_sign(),
        "back" => calculator.press_backspace(),
        "clear" | "c" => calculator.press_clear(),
        "history" => {
            print_history(synchronizer);
            return Ok(());
        }
        "sync" => {
            synchronizer.sync().await?;
            println!("synced ({} entries)", synchronizer.entries().len());
            return Ok(());
        }
        "stats" => {
            match synchronizer.remote_stats().await {
                Some(stats) => {
                    println!("total: {}  forced: {}", stats.total, stats.forced);
                    for op in stats.by_operation {
                        println!("  {}: {}", op.operation_type, op.count);
                    }
                }
                None => println!("stats unavailable (offline?)"),
            }
            return Ok(());
        }
        "clear-history" => {
            synchronizer.clear().await?;
            println!("history cleared");
            return Ok(());
        }
        other if other.starts_with("rule") => {
            handle_rule(other, calculator, synchronizer, store).await?;
            return Ok(());
        }
        other => {
            if let Ok(operator) = Operator::try_from(other) {
                calculator.press_operator(operator);
            } else if other.chars().all(|ch| ch.is_ascii_digit()) {
                for ch in other.chars() {
                    let digit = ch.to_digit(10).map(|d| d as u8).unwrap_or(0);
                    calculator.press_digit(digit);
                }
            } else {
                return Err(AppError::Input(format!("unknown input: {other}")));
            }
        }
    }

    print_display(calculator);
    Ok(())
}

/// `rule` shows the active rule; `rule <forced> <second> <trigger>` replaces
/// it, with blank or non-numeric fields clearing the corresponding value.
async fn handle_rule(
    input: &str,
    calculator: &mut Calculator,
    synchronizer: &Synchronizer,
    store: &LocalStore,
) -> Result<()> {
    let mut fields = input.split_whitespace().skip(1);
    let (forced, second, trigger) = match (fields.next(), fields.next(), fields.next()) {
        (None, _, _) => {
            print_rule(calculator.rule());
            return Ok(());
        }
        (Some(forced), second, trigger) => {
            (forced, second.unwrap_or(""), trigger.unwrap_or(""))
        }
    };

    let rule = ForcingRule::from_form_fields(forced, second, trigger);
    store.save_rule(&rule)?;
    synchronizer.push_rule(&rule).await;
    calculator.set_rule(rule);
    print_rule(calculator.rule());
    Ok(())
}

fn print_rule(rule: &ForcingRule) {
    let show = |value: Option<f64>| match value {
        Some(value) => format_value(value),
        None => "-".to_string(),
    };
    println!(
        "forced: {}  second: {}  trigger: {}",
        show(rule.forced_number),
        show(rule.second_force_number),
        show(rule.second_force_trigger_number)
    );
}

fn print_history(synchronizer: &Synchronizer) {
    if synchronizer.entries().is_empty() {
        println!("history is empty");
        return;
    }
    for entry in synchronizer.entries() {
        let marker = if entry.forced { "*" } else { " " };
        let synced = if entry.synced { "" } else { " (unsynced)" };
        println!(
            "{} {}{} = {}{}",
            entry.timestamp,
            entry.expression,
            marker,
            format_value(entry.result),
            synced
        );
    }
}

fn print_help() {
    println!("digits        enter a number, e.g. 42");
    println!(".             decimal point");
    println!("+ - * / x ÷ × operators");
    println!("%             percent");
    println!("=             evaluate");
    println!("age           age from the displayed birth year");
    println!("sign          toggle sign");
    println!("back          backspace");
    println!("clear, c      reset the calculator");
    println!("history       show local history");
    println!("sync          force a sync pass");
    println!("stats         server-side aggregate counts");
    println!("clear-history delete local and remote history");
    println!("rule [f s t]  show or set the forcing rule");
    println!("quit, exit    leave");
}
