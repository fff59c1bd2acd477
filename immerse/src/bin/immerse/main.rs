mod commands;
mod context;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};

use commands::{
    feed::{FeedArgs, handle_feed},
    post::{
        CommentCommands, PostCommands, PostTarget, RateArgs, handle_comment_commands, handle_flag, handle_like,
        handle_post_commands, handle_rate, handle_unrate,
    },
    social::{UserCommands, UserTarget, handle_block, handle_follow, handle_notifications, handle_user_commands},
};
use context::ClientContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{THEME, icons};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL of the document store"),
    ("IMMERSE_PREFIX", "Key prefix, overrides [redis].prefix"),
    ("RUST_LOG", "Log filter, e.g. immerse=debug"),
];

#[derive(Parser)]
#[command(name = "immerse")]
#[command(version)]
#[command(
    about = "Terminal client for the immerse short-video feed",
    long_about = r#"Terminal client for the immerse short-video feed.

Browse the shuffled feed with your likes, flags and ratings resolved, and act on
posts and users against the Redis document store.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (defaults to ./immerse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user id
    #[arg(long, env = "IMMERSE_VIEWER", global = true)]
    viewer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        let matches = match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => matches,
            Err(err) => exit_with_clap_error(err),
        };
        match Cli::from_arg_matches(&matches) {
            Ok(cli) => cli,
            Err(err) => exit_with_clap_error(err),
        }
    }
}

fn exit_with_clap_error(err: clap::error::Error) -> ! {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = print_blank_line_stdout();
            if let Err(print_err) = err.print()
                && print_err.kind() != io::ErrorKind::BrokenPipe
            {
                eprintln!("Failed to display help: {print_err}");
            }
            let _ = print_blank_line_stdout();
            std::process::exit(0);
        }
        _ => {
            let exit_code = err.exit_code();
            let _ = print_blank_line_stderr();
            if let Err(print_err) = err.print()
                && print_err.kind() != io::ErrorKind::BrokenPipe
            {
                eprintln!("Failed to display error: {print_err}");
            }
            let _ = print_blank_line_stderr();
            std::process::exit(exit_code);
        }
    }
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.primary, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(icons::ARROW, theme.secondary, false, use_color);
            let command_text = stylize(command, theme.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }
    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.highlight, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }
    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.highlight, true, use_color);
    let tip_text = stylize(
        "Use 'immerse <command> --help' to view examples for each command.",
        theme.secondary,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");
    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let theme = &THEME;
    Styles::styled()
        .usage(style_from_color(theme.primary).bold())
        .header(style_from_color(theme.highlight).bold())
        .literal(style_from_color(theme.secondary))
        .placeholder(style_from_color(theme.muted))
        .valid(style_from_color(theme.success))
        .invalid(style_from_color(theme.warning))
        .error(style_from_color(theme.error).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the shuffled, annotated feed
    Feed(FeedArgs),

    /// Show, publish or delete posts
    #[command(subcommand)]
    Post(PostCommands),

    /// Like a post
    Like(PostTarget),

    /// Remove your like from a post
    Unlike(PostTarget),

    /// Rate a post from 1 to 5 stars
    Rate(RateArgs),

    /// Remove your rating from a post
    Unrate(PostTarget),

    /// Report a post
    Flag(PostTarget),

    /// Withdraw your report of a post
    Unflag(PostTarget),

    /// List, add or delete comments
    #[command(subcommand)]
    Comment(CommentCommands),

    /// Follow a user
    Follow(UserTarget),

    /// Stop following a user
    Unfollow(UserTarget),

    /// Block a user; their videos are withheld from your feed
    Block(UserTarget),

    /// Unblock a user
    Unblock(UserTarget),

    /// List users and profile counters
    #[command(subcommand)]
    Users(UserCommands),

    /// Show your notifications
    Notifications,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();

    let _ = print_blank_line_stdout();

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    match execute(cli, &output).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            output.error(&format!("{err:#}"));
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let ctx = ClientContext::connect(cli.config.as_deref(), cli.viewer.as_deref()).await?;
    output.verbose(&format!("config: {}", ctx.config_path.display()));
    if cli.viewer.is_none() {
        output.warning("No --viewer given; actions that write will be refused.");
    }

    match cli.command {
        Commands::Feed(args) => handle_feed(args, &ctx, output).await?,
        Commands::Post(command) => handle_post_commands(command, &ctx, output).await?,
        Commands::Like(target) => handle_like(target, true, &ctx, output).await?,
        Commands::Unlike(target) => handle_like(target, false, &ctx, output).await?,
        Commands::Rate(args) => handle_rate(args, &ctx, output).await?,
        Commands::Unrate(target) => handle_unrate(target, &ctx, output).await?,
        Commands::Flag(target) => handle_flag(target, true, &ctx, output).await?,
        Commands::Unflag(target) => handle_flag(target, false, &ctx, output).await?,
        Commands::Comment(command) => handle_comment_commands(command, &ctx, output).await?,
        Commands::Follow(target) => handle_follow(target, true, &ctx, output).await?,
        Commands::Unfollow(target) => handle_follow(target, false, &ctx, output).await?,
        Commands::Block(target) => handle_block(target, true, &ctx, output).await?,
        Commands::Unblock(target) => handle_block(target, false, &ctx, output).await?,
        Commands::Users(command) => handle_user_commands(command, &ctx, output).await?,
        Commands::Notifications => handle_notifications(&ctx, output).await?,
    }

    Ok(())
}
