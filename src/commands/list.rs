//! List site content

use anyhow::Result;

use crate::pagination::PostListing;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let source = blog.content_source(None)?;
    let mut listing =
        PostListing::first_page(source.as_ref(), blog.document_type(), blog.config.page_size())
            .await?;

    match content_type {
        "post" | "posts" => {
            listing.load_all(source.as_ref()).await?;
            println!("Posts ({}):", listing.items().len());
            for post in listing.items() {
                let date = post
                    .first_publication_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "----------".to_string());
                println!("  {} - {} [{}]", date, post.title, post.uid);
            }
        }
        "page" | "pages" => {
            let mut counts = vec![listing.items().len()];
            while listing.has_more() {
                let added = listing.load_next_page(source.as_ref()).await?.len();
                if added > 0 {
                    counts.push(added);
                }
            }
            println!("Listing pages ({}):", counts.len());
            for (index, count) in counts.iter().enumerate() {
                println!("  page {} ({} posts)", index + 1, count);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, page", content_type);
        }
    }

    Ok(())
}
