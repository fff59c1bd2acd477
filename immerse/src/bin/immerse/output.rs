use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;

use immerse::{Comment, Notification, Post, User};

use crate::theme::{THEME, icons};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table or a single line.
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                println!("{}", data.to_table(self));
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    fn line(&self, icon: &str, message: &str, color: colored::Color) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }

    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(icons::SUCCESS, message, THEME.success));
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(icons::ERROR, message, THEME.error));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(icons::WARNING, message, THEME.warning));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(icons::INFO, message, THEME.info));
        }
    }

    /// Only printed with `--verbose`.
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.line(icons::ARROW, message, THEME.muted));
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    pub fn bullet(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("  {} {text}", icons::BULLET)
            } else {
                format!("  {} {text}", icons::BULLET.color(THEME.muted))
            };
            println!("{output}");
        }
    }

    pub fn create_table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if self.options.no_color {
                    cell
                } else {
                    cell.fg(TableColor::Cyan)
                }
            })
            .collect();
        table.set_header(header_cells);
        table
    }
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Posts as listed in the feed, including the viewer's status.
#[derive(Serialize)]
pub struct PostRow {
    pub id: String,
    pub owner: String,
    pub caption: String,
    pub likes: u64,
    pub comments: u64,
    pub rating: String,
    pub ratings: u32,
    pub liked: bool,
    pub flagged: bool,
    pub viewer_rating: u8,
    pub withheld: bool,
    pub video: Option<String>,
    pub thumbnail: Option<String>,
    pub posted: String,
}

impl From<&Post> for PostRow {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            owner: post
                .owner
                .as_ref()
                .map_or_else(|| post.owner_uid.clone(), |owner| owner.username.clone()),
            caption: post.caption.clone(),
            likes: post.likes,
            comments: post.comment_count,
            rating: post.average_rating.formatted(),
            ratings: post.ratings,
            liked: post.liked_by_viewer,
            flagged: post.flagged_by_viewer,
            viewer_rating: post.viewer_rating,
            withheld: post.playable_url().is_none(),
            video: post.playable_url().map(str::to_string),
            thumbnail: post.visible_thumbnail().map(str::to_string),
            posted: format_datetime(post.timestamp),
        }
    }
}

impl TableDisplay for Vec<PostRow> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["#", "Post", "Owner", "Caption", "Likes", "Rating", "You", "Posted"]);
        for (i, row) in self.iter().enumerate() {
            let mut status = String::new();
            if row.liked {
                status.push_str(icons::LIKED);
            }
            if row.flagged {
                status.push_str(icons::FLAGGED);
            }
            if row.viewer_rating > 0 {
                status.push_str(&format!("{}{}", row.viewer_rating, icons::STAR));
            }
            if row.withheld {
                status.push_str(icons::WITHHELD);
            }
            table.add_row(vec![
                Cell::new(i),
                Cell::new(&row.id),
                Cell::new(&row.owner),
                Cell::new(&row.caption),
                Cell::new(row.likes),
                Cell::new(format!("{} ({})", row.rating, row.ratings)),
                Cell::new(status),
                Cell::new(&row.posted),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter()
            .map(|row| format!("{} likes={} rating={}", row.id, row.likes, row.rating))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
pub struct CommentRow {
    pub id: String,
    pub author: String,
    pub text: String,
    pub posted: String,
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            author: comment
                .user
                .as_ref()
                .map_or_else(|| comment.comment_owner_uid.clone(), |user| user.username.clone()),
            text: comment.comment_text.clone(),
            posted: format_datetime(comment.timestamp),
        }
    }
}

impl TableDisplay for Vec<CommentRow> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["Comment", "Author", "Text", "Posted"]);
        for row in self {
            table.add_row(vec![
                Cell::new(&row.id),
                Cell::new(&row.author),
                Cell::new(&row.text),
                Cell::new(&row.posted),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter()
            .map(|row| format!("{}: {}", row.author, row.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
pub struct NotificationRow {
    pub actor: String,
    pub message: String,
    pub post: Option<String>,
    pub when: String,
}

impl From<&Notification> for NotificationRow {
    fn from(notification: &Notification) -> Self {
        Self {
            actor: notification
                .actor
                .as_ref()
                .map_or_else(|| notification.uid.clone(), |actor| actor.username.clone()),
            message: notification.kind.describe().to_string(),
            post: notification.post_id.clone(),
            when: format_datetime(notification.timestamp),
        }
    }
}

impl TableDisplay for Vec<NotificationRow> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["From", "Activity", "Post", "When"]);
        for row in self {
            table.add_row(vec![
                Cell::new(&row.actor),
                Cell::new(&row.message),
                Cell::new(row.post.as_deref().unwrap_or("-")),
                Cell::new(&row.when),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter()
            .map(|row| format!("{} {}", row.actor, row.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Serialize)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub fullname: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
        }
    }
}

impl TableDisplay for Vec<UserRow> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table(&["User", "Username", "Name"]);
        for row in self {
            table.add_row(vec![Cell::new(&row.id), Cell::new(&row.username), Cell::new(&row.fullname)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter().map(|row| row.username.clone()).collect::<Vec<_>>().join(" ")
    }
}
