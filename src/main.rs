use ledger_session::{
    ledger::{shorten_address, LedgerReader},
    provider::{
        memory::MemoryChain,
        rpc::{AccountPoller, RpcLedger, RpcWallet},
    },
    Account, App, Backend, Config, DraftField, LedgerContract, SessionContext, SessionView,
    WalletProvider,
};
use log::{error, warn};
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

const HELP: &str = "commands: connect | set <addressTo|amount|message> <value> | send | history | refresh | dismiss | view | switch <account> | help | quit";

struct Providers {
    wallet: Option<Arc<dyn WalletProvider>>,
    contract: Option<Arc<dyn LedgerContract>>,
    /// Present for the in-memory backend only
    chain: Option<MemoryChain>,
    poller: Option<AccountPoller>,
}

fn build_providers(config: &Config) -> Providers {
    match config.backend {
        Backend::Memory => {
            let chain = MemoryChain::new(vec![
                Account::new("0x70997970c51812dc3a010c7d01b50e0d17dc79c8"),
                Account::new("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
            ]);
            Providers {
                wallet: Some(Arc::new(chain.clone())),
                contract: Some(Arc::new(chain.clone())),
                chain: Some(chain),
                poller: None,
            }
        }
        Backend::Rpc => {
            let wallet = match RpcWallet::new(&config.network_url) {
                Ok(wallet) => wallet,
                Err(e) => {
                    error!("No wallet provider at {}: {}", config.network_url, e);
                    return Providers {
                        wallet: None,
                        contract: None,
                        chain: None,
                        poller: None,
                    };
                }
            };
            let contract = config.contract_address.and_then(|address| {
                RpcLedger::new(wallet.provider().clone(), address, config.confirmations)
                    .map_err(|e| error!("Ledger contract unavailable: {}", e))
                    .ok()
            });
            let poller = wallet.spawn_account_poller(config.account_poll_interval);
            Providers {
                wallet: Some(Arc::new(wallet)),
                contract: contract.map(|c| Arc::new(c) as Arc<dyn LedgerContract>),
                chain: None,
                poller: Some(poller),
            }
        }
    }
}

fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn render(view: &SessionView) {
    if let Some(alert) = &view.alert {
        println!("[{:?}] {}", alert.kind, alert.message);
    }
    match &view.active_account {
        Some(account) => println!("Wallet Address: {}", shorten_address(account.as_str())),
        None => println!("Your wallet is not connected.."),
    }
    if view.busy {
        println!("(transaction pending)");
    }
}

fn render_history(view: &SessionView) {
    if view.transactions.is_empty() {
        println!("You have not made any transaction..");
        return;
    }
    for transaction in &view.transactions {
        println!("Sent from: {}", shorten_address(transaction.address_from.as_str()));
        println!("Sent to: {}", shorten_address(transaction.address_to.as_str()));
        println!("Amount Sent: {} (ETH)", transaction.amount);
        println!("Message: \u{201c}{}\u{201d}", transaction.message);
        println!("Date: {}", transaction.timestamp);
        println!();
    }
}

/// Handles one input line. Returns `false` once the user wants out.
async fn handle(app: &App, chain: Option<&MemoryChain>, line: &str) -> bool {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "" => return true,
        "quit" | "exit" => return false,
        "help" => println!("{}", HELP),
        "connect" => {
            let _ = app.connect().await;
        }
        "set" => {
            let (field, value) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
            match field.parse::<DraftField>() {
                Ok(field) => app.set_field(field, value.trim()),
                Err(e) => println!("{}", e),
            }
        }
        "send" => {
            let _ = app.submit(&confirm_on_stdin).await;
        }
        "history" => render_history(&app.view()),
        "refresh" => {
            let _ = app.refresh().await;
            render_history(&app.view());
        }
        "dismiss" => app.dismiss_alert(),
        "view" => match serde_json::to_string_pretty(&app.view()) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to render view: {}", e),
        },
        "switch" => match chain {
            Some(chain) => chain.switch_accounts(vec![Account::new(rest.trim())]),
            None => println!("switch is only available with LEDGER_BACKEND=memory"),
        },
        other => println!("unknown command '{}'; {}", other, HELP),
    }
    if command != "view" && command != "history" && command != "refresh" {
        render(&app.view());
    }
    true
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let providers = build_providers(&config);
    let context = SessionContext::new();
    let reader = LedgerReader::new(providers.contract.clone(), context.clone())
        .with_timestamp_format(&config.timestamp_format);
    let mut app = App::with_reader(
        providers.wallet.clone(),
        providers.contract.clone(),
        reader,
        context,
        config.submit_settings(),
    );

    if let Err(e) = runtime.block_on(app.start()) {
        warn!("Session started without account tracking: {}", e);
    }
    render(&app.view());
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if !runtime.block_on(handle(&app, providers.chain.as_ref(), &line)) {
            break;
        }
    }

    runtime.block_on(app.shutdown());
    if let Some(poller) = providers.poller {
        runtime.block_on(poller.stop());
    }
    Ok(())
}
