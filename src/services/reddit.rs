// src/services/reddit.rs

//! Reddit API client.
//!
//! Uses an application-only OAuth token (client credentials grant) and
//! the read-only listing endpoints on `oauth.reddit.com`.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{Comment, CommentForest, FeedPost, MoreComments, RedditConfig};
use crate::services::{FeedPage, PostSource};
use crate::utils::http;

const AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";

/// `morechildren` accepts at most this many ids per request.
const MORE_CHILDREN_BATCH: usize = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
    #[serde(default)]
    after: Option<String>,
}

/// A kind-tagged API object; `data` is decoded once the kind is known.
#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<Thing>,
}

/// Authenticated Reddit API client.
pub struct RedditClient {
    client: Client,
    access_token: String,
    page_size: u32,
}

impl RedditClient {
    /// Build the HTTP client and obtain an application-only access token.
    pub async fn connect(config: &RedditConfig) -> Result<Self> {
        config.require_credentials()?;
        let client = http::create_client(config)?;

        // Client id and secret go in a basic auth header, as Reddit expects
        let oauth = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string())?,
            Some(TokenUrl::new(TOKEN_URL.to_string())?),
        );
        let token = oauth
            .exchange_client_credentials()
            .request_async(|request| http::oauth_request(&client, request))
            .await
            .map_err(|e| AppError::auth(format!("access_token: {e}")))?;

        log::debug!("Obtained Reddit application token");
        Ok(Self {
            client,
            access_token: token.access_token().secret().clone(),
            page_size: config.page_size,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{API_BASE}{path}");
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        let response =
            http::error_for_status(response, path, |c, m| AppError::reddit(c, m)).await?;
        Ok(response.json().await?)
    }
}

/// Decode the posts of a listing, skipping anything that is not a link.
fn parse_posts(listing: Listing) -> Result<FeedPage> {
    let mut posts = Vec::with_capacity(listing.data.children.len());
    for thing in listing.data.children {
        if thing.kind == "t3" {
            posts.push(serde_json::from_value::<FeedPost>(thing.data)?);
        }
    }
    Ok(FeedPage {
        posts,
        after: listing.data.after.filter(|a| !a.is_empty()),
    })
}

/// Split comment things into comments and placeholders.
fn parse_forest(things: Vec<Thing>) -> Result<CommentForest> {
    let mut forest = CommentForest::default();
    for thing in things {
        match thing.kind.as_str() {
            "t1" => forest.comments.push(serde_json::from_value(thing.data)?),
            "more" => {
                let more: MoreComments = serde_json::from_value(thing.data)?;
                // "continue this thread" stubs carry no ids
                if !more.children.is_empty() {
                    forest.placeholders.push(more);
                }
            }
            other => log::debug!("Ignoring comment listing entry of kind {}", other),
        }
    }
    Ok(forest)
}

#[async_trait]
impl PostSource for RedditClient {
    async fn fetch_new(&self, subreddit: &str, after: Option<&str>) -> Result<FeedPage> {
        let path = format!("/r/{subreddit}/new");
        let limit = self.page_size.to_string();
        let mut query = vec![("limit", limit.as_str()), ("raw_json", "1")];
        if let Some(after) = after {
            query.push(("after", after));
        }

        let listing: Listing = self.get_json(&path, &query).await?;
        let page = parse_posts(listing)?;
        log::debug!("Fetched {} posts from r/{}", page.posts.len(), subreddit);
        Ok(page)
    }

    async fn fetch_comments(&self, post: &FeedPost) -> Result<CommentForest> {
        let path = format!("/r/{}/comments/{}", post.subreddit, post.id);
        let listings: Vec<Listing> = self
            .get_json(&path, &[("depth", "1"), ("raw_json", "1")])
            .await?;

        // [0] is the post itself, [1] its comments
        let comments = listings
            .into_iter()
            .nth(1)
            .ok_or_else(|| AppError::reddit(&path, "missing comment listing"))?;
        parse_forest(comments.data.children)
    }

    async fn expand_more(&self, post: &FeedPost, more: &MoreComments) -> Result<Vec<Comment>> {
        let link_id = post.fullname();
        let mut expanded = Vec::new();

        for batch in more.children.chunks(MORE_CHILDREN_BATCH) {
            let children = batch.join(",");
            let response: MoreChildrenResponse = self
                .get_json(
                    "/api/morechildren",
                    &[
                        ("api_type", "json"),
                        ("link_id", link_id.as_str()),
                        ("children", children.as_str()),
                        ("raw_json", "1"),
                    ],
                )
                .await?;

            let things = response.json.data.map(|d| d.things).unwrap_or_default();
            let forest = parse_forest(things)?;
            expanded.extend(
                forest
                    .comments
                    .into_iter()
                    .filter(|c| c.parent_id == link_id),
            );
        }

        log::debug!(
            "Expanded placeholder on {} into {} top-level comments",
            link_id,
            expanded.len()
        );
        Ok(expanded)
    }
}
