use anyhow::Result;
use clap::Args;

use crate::context::ClientContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, PostRow};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Browse",
    commands: &[
        "immerse --viewer uid0001 feed              # Shuffled feed with your likes and ratings",
        "immerse --viewer uid0001 feed --from 3     # Also preload the posts after index 3",
        "immerse --output json feed                 # Machine-readable feed",
    ],
}];

#[derive(Args)]
pub struct FeedArgs {
    /// Index of the visible post; the posts after it are preloaded
    #[arg(long)]
    pub from: Option<usize>,
}

pub async fn handle_feed(args: FeedArgs, ctx: &ClientContext, output: &OutputManager) -> Result<()> {
    let mut feed = ctx.immerse.feed();
    feed.refresh().await?;
    let state = feed.state();
    if state.empty {
        output.info("The feed is empty.");
        return Ok(());
    }

    let rows: Vec<PostRow> = feed.posts().iter().map(PostRow::from).collect();
    output.display(&rows)?;

    if let Some(current) = args.from {
        let report = feed.preload_from(current);
        output.verbose(&format!(
            "{} cached, {} withheld, {} failed",
            report.cached, report.skipped, report.failed
        ));
        for post_id in &report.prepared {
            output.bullet(&format!("preloaded {post_id}"));
        }
    }
    Ok(())
}
