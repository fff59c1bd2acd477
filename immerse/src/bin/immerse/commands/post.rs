use anyhow::Result;
use clap::{Args, Subcommand};

use immerse::StarRating;
use immerse::services::NewPost;

use crate::context::ClientContext;
use crate::examples::ExampleGroup;
use crate::output::{CommentRow, OutputManager, PostRow};

pub const POST_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect",
        commands: &["immerse --viewer uid0001 post show Xk3q...   # Counters, rating and your status"],
    },
    ExampleGroup {
        title: "Publish",
        commands: &[
            "immerse --viewer uid0001 post publish https://cdn.example/v.mov --caption \"Sunrise\"",
            "immerse --viewer uid0001 post delete Xk3q...",
        ],
    },
];

pub const COMMENT_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Comments",
    commands: &[
        "immerse comment list Xk3q...",
        "immerse --viewer uid0001 comment add Xk3q... \"Nice shot\"",
    ],
}];

#[derive(Subcommand)]
pub enum PostCommands {
    /// Show a post with the viewer's like, flag and rating
    Show { post_id: String },

    /// Publish a post for an already hosted video
    Publish {
        video_url: String,
        #[arg(long, default_value = "")]
        caption: String,
    },

    /// Delete one of your posts
    Delete { post_id: String },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// List comments, oldest first
    List { post_id: String },

    /// Comment on a post
    Add { post_id: String, text: String },

    /// Delete one of your comments
    Delete { post_id: String, comment_id: String },
}

#[derive(Args)]
pub struct PostTarget {
    pub post_id: String,
}

#[derive(Args)]
pub struct RateArgs {
    pub post_id: String,
    /// Stars, 1 to 5
    #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
    pub stars: u8,
}

pub async fn handle_post_commands(command: PostCommands, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let posts = ctx.immerse.posts();
    match command {
        PostCommands::Show { post_id } => {
            let mut post = posts.fetch_post(&post_id).await?;
            if let Ok(owner) = ctx.immerse.users().fetch_user(&post.owner_uid).await {
                post.owner = Some(owner);
            }
            if ctx.immerse.session().is_signed_in() {
                post.liked_by_viewer = posts.has_liked(&post_id).await?;
                post.flagged_by_viewer = posts.is_flagged(&post_id).await?;
                post.viewer_rating = posts.viewer_rating(&post_id).await?;
            }
            output.display(&vec![PostRow::from(&post)])?;
        }
        PostCommands::Publish { video_url, caption } => {
            let post = ctx
                .immerse
                .uploads()
                .upload_post(NewPost {
                    caption,
                    video_url,
                    thumbnail: None,
                })
                .await?;
            output.success(&format!("Published post {}", post.id));
        }
        PostCommands::Delete { post_id } => {
            posts.delete_post(&post_id).await?;
            output.success(&format!("Deleted post {post_id}"));
        }
    }
    Ok(())
}

pub async fn handle_like(target: PostTarget, like: bool, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let posts = ctx.immerse.posts();
    let likes = if like {
        posts.like_post(&target.post_id).await?
    } else {
        posts.unlike_post(&target.post_id).await?
    };
    output.success(&format!("Post {} has {likes} likes", target.post_id));
    Ok(())
}

pub async fn handle_rate(args: RateArgs, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let rating = StarRating::new(args.stars)?;
    let aggregate = ctx.immerse.posts().rate_post(&args.post_id, rating).await?;
    output.success(&format!(
        "Rated {} stars; average {} over {} ratings",
        args.stars,
        aggregate.formatted(),
        aggregate.count()
    ));
    Ok(())
}

pub async fn handle_unrate(target: PostTarget, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let aggregate = ctx.immerse.posts().remove_rating(&target.post_id).await?;
    output.success(&format!(
        "Rating removed; average {} over {} ratings",
        aggregate.formatted(),
        aggregate.count()
    ));
    Ok(())
}

pub async fn handle_flag(target: PostTarget, flag: bool, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let posts = ctx.immerse.posts();
    if flag {
        let post = posts.fetch_post(&target.post_id).await?;
        posts.flag_post(&post.id, &post.owner_uid).await?;
        output.success(&format!("Flagged post {}", post.id));
    } else {
        posts.unflag_post(&target.post_id).await?;
        output.success(&format!("Removed flag from post {}", target.post_id));
    }
    Ok(())
}

pub async fn handle_comment_commands(
    command: CommentCommands,
    ctx: &ClientContext,
    output: &OutputManager,
) -> Result<()> {
    let comments = ctx.immerse.comments();
    match command {
        CommentCommands::List { post_id } => {
            let rows: Vec<CommentRow> = comments.fetch_comments(&post_id).await?.iter().map(CommentRow::from).collect();
            output.display(&rows)?;
        }
        CommentCommands::Add { post_id, text } => {
            let comment = comments.upload_comment(&post_id, &text).await?;
            output.success(&format!("Added comment {}", comment.id));
        }
        CommentCommands::Delete { post_id, comment_id } => {
            comments.delete_comment(&post_id, &comment_id).await?;
            output.success(&format!("Deleted comment {comment_id}"));
        }
    }
    Ok(())
}
