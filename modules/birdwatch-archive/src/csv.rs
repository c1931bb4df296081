use std::path::Path;

use tracing::info;

use birdwatch_common::Conversation;
use twitterapi_client::Tweet;

use crate::error::Result;

const HEADER: &str =
    "id,date,username,name,text,likes,retweets,replies,views,verified,url,hashtags,replies_downloaded";

/// Export a conversation as a flat CSV: one row per root tweet and one row
/// per reply. The `replies_downloaded` column carries the retrieved reply
/// count on root rows and 0 on reply rows.
///
/// Written with a UTF-8 BOM so spreadsheet tools pick the right encoding.
pub async fn export_csv(conversation: &Conversation, path: &Path) -> Result<()> {
    let mut out = String::from("\u{feff}");
    out.push_str(HEADER);
    out.push('\n');

    let mut rows = 0usize;
    for entry in &conversation.tweets {
        push_row(&mut out, &entry.tweet, entry.replies.len());
        rows += 1;
        for reply in &entry.replies {
            push_row(&mut out, reply, 0);
            rows += 1;
        }
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, out).await?;

    info!(path = %path.display(), rows, "CSV exported");
    Ok(())
}

fn push_row(out: &mut String, tweet: &Tweet, replies_downloaded: usize) {
    let fields = [
        tweet.id.clone().unwrap_or_default(),
        tweet.time_parsed.clone(),
        tweet.username.clone(),
        tweet.name.clone(),
        tweet.text.clone(),
        tweet.likes.to_string(),
        tweet.retweets.to_string(),
        tweet.replies.to_string(),
        tweet.views.to_string(),
        tweet.verified().to_string(),
        tweet.permanent_url.clone(),
        tweet.hashtags.join(","),
        replies_downloaded.to_string(),
    ];
    let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Minimal RFC-4180 quoting: fields with commas, quotes, or line breaks are
/// wrapped in double quotes, with inner quotes doubled.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
