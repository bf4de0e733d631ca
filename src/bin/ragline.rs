//! Ask one question over a set of documents from the command line.
//!
//! ```bash
//! COHERE_API_KEY=... ragline "How do I make the soup?" recipes.pdf notes.txt
//! ```
//!
//! Sources may be local `.pdf`/`.txt`/`.md` files, `http(s)` URLs (PDF when
//! the path ends in `.pdf`, plain text otherwise), or YouTube watch URLs
//! (`yt:VIDEO_ID` also works) for transcript ingestion.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use url::Url;

use ragline::chat::cohere::CohereChat;
use ragline::embeddings::cohere::CohereEmbeddings;
use ragline::ingestion::SourceDescriptor;
use ragline::pipeline::{IndexConfig, RagPipeline};
use ragline::types::RagError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RagError> {
    let mut args = env::args().skip(1);
    let Some(question) = args.next() else {
        eprintln!("usage: ragline <question> <source>...");
        return Ok(());
    };
    let sources: Vec<SourceDescriptor> = args
        .map(|arg| parse_source(&arg))
        .collect::<Result<_, _>>()?;
    if sources.is_empty() {
        eprintln!("usage: ragline <question> <source>...");
        return Ok(());
    }

    let api_key = env::var("COHERE_API_KEY")
        .map_err(|_| RagError::Chat("COHERE_API_KEY is not set".into()))?;

    let http = reqwest::Client::new();
    let pipeline = RagPipeline::builder()
        .embeddings(Arc::new(CohereEmbeddings::new(http.clone(), &api_key)?))
        .chat(Arc::new(CohereChat::new(http.clone(), &api_key)?))
        .http_client(http)
        .index(IndexConfig::Sqlite {
            dir: "./ragline_vectorstore".into(),
        })
        .build();

    let handle = pipeline.build(&sources).await?;
    let answer = pipeline.ask(&handle, &question).await?;
    println!("{answer}");
    handle.close().await
}

fn parse_source(arg: &str) -> Result<SourceDescriptor, RagError> {
    if let Some(video_id) = arg.strip_prefix("yt:") {
        return SourceDescriptor::youtube_transcript(video_id, "en");
    }
    if arg.starts_with("http://") || arg.starts_with("https://") {
        let url = Url::parse(arg).map_err(|err| RagError::Load {
            source_id: arg.to_string(),
            reason: err.to_string(),
        })?;
        if url.host_str().is_some_and(|host| host.ends_with("youtube.com")) {
            if let Some((_, video_id)) = url.query_pairs().find(|(key, _)| key == "v") {
                return SourceDescriptor::youtube_transcript(&video_id, "en");
            }
        }
        if url.path().to_ascii_lowercase().ends_with(".pdf") {
            return Ok(SourceDescriptor::remote_pdf(url));
        }
        return Ok(SourceDescriptor::remote_text(url));
    }
    Ok(SourceDescriptor::local(arg))
}
