use anyhow::Result;
use clap::{Args, Subcommand};

use immerse::services::UserList;

use crate::context::ClientContext;
use crate::examples::ExampleGroup;
use crate::output::{NotificationRow, OutputManager, UserRow};

pub const USER_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Relationships",
        commands: &[
            "immerse --viewer uid0001 follow uid0002",
            "immerse --viewer uid0001 block uid0003     # Hides uid0003's videos from your feed",
        ],
    },
    ExampleGroup {
        title: "Lists",
        commands: &[
            "immerse users followers uid0002",
            "immerse --viewer uid0001 users blocked",
        ],
    },
];

#[derive(Args)]
pub struct UserTarget {
    pub user_id: String,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Every user except yourself
    All,
    /// Users following a user
    Followers { user_id: String },
    /// Users a user follows
    Following { user_id: String },
    /// Users who liked a post
    Likes { post_id: String },
    /// Users you have blocked
    Blocked,
    /// Profile counters of a user
    Stats { user_id: String },
}

pub async fn handle_follow(target: UserTarget, follow: bool, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let users = ctx.immerse.users();
    if follow {
        users.follow(&target.user_id).await?;
        output.success(&format!("Following {}", target.user_id));
    } else {
        users.unfollow(&target.user_id).await?;
        output.success(&format!("Unfollowed {}", target.user_id));
    }
    Ok(())
}

pub async fn handle_block(target: UserTarget, block: bool, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let users = ctx.immerse.users();
    if block {
        users.block_user(&target.user_id).await?;
        output.success(&format!("Blocked {}", target.user_id));
    } else {
        users.unblock_user(&target.user_id).await?;
        output.success(&format!("Unblocked {}", target.user_id));
    }
    Ok(())
}

pub async fn handle_user_commands(command: UserCommands, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let users = ctx.immerse.users();
    let list = match command {
        UserCommands::Stats { user_id } => {
            let stats = users.fetch_user_stats(&user_id).await?;
            output.key_value("following", &stats.following.to_string());
            output.key_value("followers", &stats.followers.to_string());
            output.key_value("likes", &stats.likes.to_string());
            output.key_value("posts", &stats.posts.to_string());
            return Ok(());
        }
        UserCommands::All => UserList::All,
        UserCommands::Followers { user_id } => UserList::Followers(user_id),
        UserCommands::Following { user_id } => UserList::Following(user_id),
        UserCommands::Likes { post_id } => UserList::Likes(post_id),
        UserCommands::Blocked => UserList::Blocked,
    };
    output.verbose(list.navigation_title());
    let rows: Vec<UserRow> = users.fetch_user_list(&list).await?.iter().map(UserRow::from).collect();
    output.display(&rows)
}

pub async fn handle_notifications(ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let notifications = ctx.immerse.notifications().fetch_notifications().await?;
    if notifications.is_empty() {
        output.info("No notifications.");
        return Ok(());
    }
    let rows: Vec<NotificationRow> = notifications.iter().map(NotificationRow::from).collect();
    output.display(&rows)
}
