use std::{fmt::Write, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::{Local, TimeZone};
use postview_client::{
    api::{GroupingMode, Post, PostId},
    local_datetime, ClientConfig, HttpPostSource, PostTreeState, Store, TreeCoordinator,
};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "http://localhost:3000")]
    host: String,

    /// Timezone used to number weeks and print times, eg. Europe/Paris
    ///
    /// Defaults to the local timezone.
    #[structopt(long)]
    timezone: Option<chrono_tz::Tz>,

    #[structopt(long, default_value = "10")]
    timeout_secs: u64,

    #[structopt(long, default_value = "3")]
    max_retries: u32,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the posts grouped into branches
    Tree {
        /// One of week, author or location
        #[structopt(short, long, default_value = "week")]
        group_by: GroupingMode,

        /// Also print the text of these posts
        #[structopt(long)]
        open: Vec<i64>,
    },

    /// Print all the posts as JSON
    Posts,
}

fn format_time<Tz: TimeZone>(time: i64, tz: &Tz) -> String {
    match local_datetime(time, tz) {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("@{time}"),
    }
}

fn render_post<Tz: TimeZone>(out: &mut String, p: &Post, tz: &Tz) {
    let _ = writeln!(
        out,
        "  #{:<5} {}  {} @ {}",
        p.id.0,
        format_time(p.time, tz),
        p.author,
        p.location
    );
    if p.open {
        for line in p.text.lines() {
            let _ = writeln!(out, "         {line}");
        }
    }
}

fn render_tree<Tz: TimeZone>(state: &PostTreeState, tz: &Tz) -> String {
    let mut out = String::new();
    for branch in state.tree.iter() {
        let _ = writeln!(out, "{} ({})", branch.key, branch.post_ids.len());
        for p in state.branch_posts(branch) {
            render_post(&mut out, p, tz);
        }
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let config = ClientConfig {
        host: opt.host,
        timeout: Duration::from_secs(opt.timeout_secs),
        max_retries: opt.max_retries,
        timezone: opt.timezone,
    };
    let source = HttpPostSource::new(&config)?;
    let mut coord = TreeCoordinator::new(Arc::new(Store::new()), source, &config);
    coord
        .load_posts()
        .await
        .with_context(|| format!("loading posts from {}", config.posts_url()))?;

    match opt.cmd {
        Command::Tree { group_by, open } => {
            coord.set_grouping_mode(group_by)?;
            for id in open {
                coord.open_post(PostId(id))?;
            }
            let state = coord.store().get_state();
            let rendered = match config.timezone {
                Some(tz) => render_tree(&state, &tz),
                None => render_tree(&state, &Local),
            };
            print!("{rendered}");
        }
        Command::Posts => {
            let state = coord.store().get_state();
            let mut posts = state.posts.values().collect::<Vec<_>>();
            posts.sort_unstable_by_key(|p| p.id);
            println!(
                "{}",
                serde_json::to_string_pretty(&posts).context("serializing posts")?
            );
        }
    }

    Ok(())
}
