use clap::{Args, Parser, Subcommand};
use colored::*;
use stampgen::{
    history::CLEAR_QUESTION,
    logger::{self, LogLevel, LoggerConfig},
    storage, Clipboard, Config, FormField, HistoryPanel, HistoryStore, PromptClient,
    ResultPresenter, Session, SessionClipboard, StampError, SystemClipboard,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(name = "stampgen")]
#[command(version, about = "Generate detailed 3D stamp/poster render prompts with Gemini", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Directory holding the history file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep history in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Gemini model id
    #[arg(long, global = true)]
    model: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Developer logging: debug level with module and file location
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a prompt from the given fields
    Generate(GenerateArgs),
    /// Inspect or clear the generation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Fill the form step by step in an interactive session
    Interactive,
}

#[derive(Args)]
struct GenerateArgs {
    /// Stamp name (central text)
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Theme, e.g. Halloween, Cyberpunk
    #[arg(long, short = 't')]
    theme: Option<String>,

    /// Main colors
    #[arg(long, short = 'c')]
    colors: Option<String>,

    /// Desired effects, e.g. Glow, Fire, Metallic
    #[arg(long, short = 'e')]
    effects: Option<String>,

    /// Reference image (repeatable)
    #[arg(long = "image", short = 'i')]
    images: Vec<PathBuf>,

    /// Start from the fields of history item N (1 = newest)
    #[arg(long)]
    from_history: Option<usize>,

    /// Copy the generated prompt to the clipboard
    #[arg(long)]
    copy: bool,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List past generations
    List,
    /// Print the full prompt of item N (1 = newest)
    Show { index: usize },
    /// Copy the prompt of item N to the clipboard
    Copy { index: usize },
    /// Delete the whole history
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Anything but y/yes/s/sim (or end of input) is a no.
async fn ask_yes_no<R>(input: &mut Lines<R>, question: &str) -> bool
where
    R: AsyncBufRead + Unpin,
{
    print!("{} [y/N] ", question);
    let _ = io::stdout().flush();
    match input.next_line().await {
        Ok(Some(answer)) => matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes" | "s" | "sim"
        ),
        Ok(None) => false,
        Err(e) => {
            log::error!("Failed to read answer: {}", e);
            false
        }
    }
}

fn logger_config(cli: &Cli) -> LoggerConfig {
    let mut config = if cli.verbose {
        LoggerConfig::development()
    } else {
        LoggerConfig::from_env()
    };
    config = config
        .with_colors(!cli.no_color)
        .with_json_output(cli.log_json);
    if let Some(level) = cli.log_level {
        config = config.with_level(level);
    }
    if let Some(path) = &cli.log_file {
        config = config.with_file_output(&path.to_string_lossy());
    }
    config
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logger::init_with_config(logger_config(&cli))?;

    if dotenv_loaded {
        log::debug!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    let mut config = Config::from_env().with_ephemeral(cli.ephemeral);
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(model) = &cli.model {
        config.gemini = config.gemini.with_model(model);
    }
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &config);

    let storage = storage::open(&config).await?;
    let history = HistoryStore::load(storage).await;
    let client = PromptClient::new(config.gemini.clone());
    let mut session = Session::new(client, history);
    let colors = !cli.no_color;
    spawn_progress_indicator(&session);

    match cli.command {
        Commands::Generate(args) => generate(&mut session, args, colors).await?,
        Commands::History { action } => history_command(&mut session, action, colors).await?,
        Commands::Interactive => interactive(&mut session, colors).await?,
    }

    Ok(())
}

/// Prints a notice whenever the session starts generating.
fn spawn_progress_indicator(session: &Session) {
    let mut state_rx = session.subscribe();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow();
            if state.is_generating() {
                eprintln!("⏳ Analyzing style... building the 3D prompt structure");
            }
        }
    });
}

fn report_copy(result: stampgen::Result<()>) {
    match result {
        Ok(()) => eprintln!("{}", "✔ Copied!".green()),
        Err(e) => log::error!("Failed to copy to clipboard: {}", e),
    }
}

/// Copies from a one-shot command. Where this process owns the selection,
/// the copy waits until another program replaces it.
async fn copy_once(text: String) {
    let result = tokio::task::spawn_blocking(move || -> stampgen::Result<()> {
        let mut clipboard = SystemClipboard::new()?.hold_until_replaced();
        if clipboard.blocks_on_set() {
            eprintln!("Keeping the prompt on the clipboard until it is replaced (Ctrl+C to stop)...");
        }
        clipboard.set_text(&text)
    })
    .await
    .map_err(|e| StampError::Clipboard(e.to_string()))
    .and_then(|copied| copied);
    report_copy(result);
}

async fn generate(session: &mut Session, args: GenerateArgs, colors: bool) -> stampgen::Result<()> {
    if let Some(n) = args.from_history {
        session.restore(history_index(n)?)?;
    }

    let form = session.form_mut();
    let overrides = [
        (FormField::Name, args.name),
        (FormField::Theme, args.theme),
        (FormField::Colors, args.colors),
        (FormField::Effects, args.effects),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            form.set_field(field, value);
        }
    }
    form.add_images(args.images);

    let result = session.submit().await?.clone();
    println!("{}", ResultPresenter::new().render(&result, colors));
    if args.copy {
        copy_once(result.prompt).await;
    }
    Ok(())
}

fn history_index(n: usize) -> stampgen::Result<usize> {
    n.checked_sub(1)
        .ok_or_else(|| StampError::Validation("history items are numbered from 1".into()))
}

async fn history_command(
    session: &mut Session,
    action: HistoryAction,
    colors: bool,
) -> stampgen::Result<()> {
    let panel = HistoryPanel::new();
    match action {
        HistoryAction::List => {
            let text = panel.render(session.history().items(), colors);
            if text.is_empty() {
                println!("History is empty.");
            } else {
                print!("{}", text);
            }
        }
        HistoryAction::Show { index } => {
            let item = history_item(session, index)?;
            println!("{}", item.prompt);
        }
        HistoryAction::Copy { index } => {
            let prompt = history_item(session, index)?.prompt.clone();
            copy_once(prompt).await;
        }
        HistoryAction::Clear { yes } => {
            if session.history().is_empty() {
                println!("History is empty.");
                return Ok(());
            }
            let confirmed = yes || ask_yes_no(&mut stdin_lines(), CLEAR_QUESTION).await;
            if session.clear_history(&mut |_: &str| confirmed).await? {
                println!("History cleared.");
            }
        }
    }
    Ok(())
}

fn history_item(session: &Session, n: usize) -> stampgen::Result<&stampgen::HistoryItem> {
    session
        .history()
        .get(history_index(n)?)
        .ok_or_else(|| StampError::Validation(format!("no history item #{}", n)))
}

const REPL_HELP: &str = "\
Commands:
  show                      show the current form
  set <field> <value>       field is name, theme, colors or effects
  add <path>...             attach reference images
  rm <n>                    remove attached image n
  submit                    generate the prompt
  result                    show the last result
  copy                      copy the last result
  history                   list past generations
  restore <n>               load history item n into the form
  copy-history <n>          copy the prompt of history item n
  clear                     clear the history (asks first)
  help                      show this help
  quit                      leave";

fn render_form(session: &Session) -> String {
    let form = session.form();
    let mut out = String::new();
    for field in FormField::ALL {
        out.push_str(&format!("  {:<28} {}\n", field.label(), form.get(field)));
    }
    if form.images().is_empty() {
        out.push_str("  Reference images             (none)\n");
    } else {
        out.push_str("  Reference images\n");
        for (i, image) in form.images().iter().enumerate() {
            out.push_str(&format!("    {}. {} ({})\n", i + 1, image.file_name(), image.mime_type));
        }
    }
    out
}

async fn interactive(session: &mut Session, colors: bool) -> stampgen::Result<()> {
    let mut presenter = ResultPresenter::new();
    let mut panel = HistoryPanel::new();
    let mut clipboard = SessionClipboard::new(SystemClipboard::new);
    let mut input = stdin_lines();

    println!("3D Stamp Generator. Type 'help' for commands.");
    loop {
        print!("{} ", "stampgen>".bright_magenta().bold());
        let _ = io::stdout().flush();

        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                break;
            }
        };

        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => println!("{}", REPL_HELP),
            "quit" | "exit" => break,
            "show" => print!("{}", render_form(session)),
            "set" => match rest.split_once(char::is_whitespace) {
                Some((field, value)) => match field.parse::<FormField>() {
                    Ok(field) => session.form_mut().set_field(field, value.trim()),
                    Err(e) => eprintln!("{}", e),
                },
                None => match rest.parse::<FormField>() {
                    Ok(field) => session.form_mut().set_field(field, ""),
                    Err(e) => eprintln!("{}", e),
                },
            },
            "add" => {
                session.form_mut().add_images(rest.split_whitespace());
                print!("{}", render_form(session));
            }
            "rm" => match rest.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    session.form_mut().remove_image(n - 1);
                    print!("{}", render_form(session));
                }
                _ => eprintln!("usage: rm <n>"),
            },
            "submit" | "generate" => match session.submit().await {
                Ok(result) => println!("{}", presenter.render(result, colors)),
                Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
            },
            "result" => match session.result() {
                Some(result) => println!("{}", presenter.render(result, colors)),
                None => println!("Fill in the form and run 'submit'."),
            },
            "copy" => match session.result() {
                Some(result) => report_copy(presenter.copy(result, &mut clipboard)),
                None => eprintln!("nothing to copy yet"),
            },
            "history" => {
                let text = panel.render(session.history().items(), colors);
                if text.is_empty() {
                    println!("History is empty.");
                } else {
                    print!("{}", text);
                }
            }
            "restore" => match rest.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                Some(index) => match session.restore(index).map(|_| ()) {
                    Ok(()) => print!("{}", render_form(session)),
                    Err(e) => eprintln!("{}", e),
                },
                None => eprintln!("usage: restore <n>"),
            },
            "copy-history" => match rest.parse::<usize>() {
                Ok(n) => match history_item(session, n) {
                    Ok(item) => report_copy(panel.copy(item, &mut clipboard)),
                    Err(e) => eprintln!("{}", e),
                },
                Err(_) => eprintln!("usage: copy-history <n>"),
            },
            "clear" if session.history().is_empty() => println!("History is empty."),
            "clear" => {
                let confirmed = ask_yes_no(&mut input, CLEAR_QUESTION).await;
                match session.clear_history(&mut |_: &str| confirmed).await {
                    Ok(true) => println!("History cleared."),
                    Ok(false) => {}
                    Err(e) => eprintln!("{}", e),
                }
            }
            other => eprintln!("unknown command '{}', try 'help'", other),
        }
    }

    Ok(())
}
