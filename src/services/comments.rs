// src/services/comments.rs

//! Top comment selection.

use std::time::Duration;

use crate::error::Result;
use crate::models::{Comment, FeedPost};
use crate::services::PostSource;

/// Pick the highest scoring comment. The earliest one wins a tie.
pub fn select_top_comment(comments: &[Comment]) -> Option<&Comment> {
    comments.iter().fold(None, |best: Option<&Comment>, comment| match best {
        Some(current) if current.score >= comment.score => Some(current),
        _ => Some(comment),
    })
}

/// Loads a post's top-level comments and selects the best one.
pub struct CommentSelector<'a> {
    source: &'a dyn PostSource,
    expand_more: bool,
    delay: Duration,
}

impl<'a> CommentSelector<'a> {
    pub fn new(source: &'a dyn PostSource, expand_more: bool) -> Self {
        Self {
            source,
            expand_more,
            delay: Duration::ZERO,
        }
    }

    /// Pause after each comment request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Return the top-level comment with the highest score, if any.
    pub async fn top_comment(&self, post: &FeedPost) -> Result<Option<Comment>> {
        if post.num_comments == 0 {
            return Ok(None);
        }

        let forest = self.source.fetch_comments(post).await?;
        if forest.is_empty() {
            // The count includes removed and hidden comments
            log::debug!(
                "{} counts {} comments but none were listed",
                post.id,
                post.num_comments
            );
            self.pause().await;
            return Ok(None);
        }

        let link_id = post.fullname();
        let mut comments: Vec<Comment> = forest
            .comments
            .into_iter()
            .filter(|c| c.parent_id.is_empty() || c.parent_id == link_id)
            .collect();

        if self.expand_more {
            for more in &forest.placeholders {
                comments.extend(self.source.expand_more(post, more).await?);
            }
        } else if !forest.placeholders.is_empty() {
            log::debug!(
                "Discarding {} unloaded comment placeholders on {}",
                forest.placeholders.len(),
                post.id
            );
        }

        self.pause().await;
        Ok(select_top_comment(&comments).cloned())
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{CommentForest, MoreComments};
    use crate::services::{FakeSource, post_at};

    fn comment(id: &str, score: i64) -> Comment {
        Comment {
            id: id.to_string(),
            body: format!("body {id}"),
            score,
            parent_id: "t3_a".to_string(),
        }
    }

    fn commented_post() -> FeedPost {
        let mut post = post_at("a", 10, Utc::now());
        post.num_comments = 3;
        post
    }

    #[test]
    fn test_select_top_comment() {
        let comments = vec![comment("x", 3), comment("y", 9), comment("z", -2)];
        assert_eq!(select_top_comment(&comments).unwrap().id, "y");
    }

    #[test]
    fn test_select_top_comment_tie_keeps_first() {
        let comments = vec![comment("x", 5), comment("y", 5)];
        assert_eq!(select_top_comment(&comments).unwrap().id, "x");
    }

    #[test]
    fn test_select_top_comment_empty() {
        assert!(select_top_comment(&[]).is_none());
    }

    #[tokio::test]
    async fn test_no_comments_skips_request() {
        let source = FakeSource::new(Vec::new(), 10);
        let selector = CommentSelector::new(&source, false);
        let post = post_at("a", 10, Utc::now());

        assert!(selector.top_comment(&post).await.unwrap().is_none());
        assert!(source.comment_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counted_but_unlisted_comments() {
        let source = FakeSource::new(Vec::new(), 10);

        let top = CommentSelector::new(&source, true)
            .top_comment(&commented_post())
            .await
            .unwrap();
        assert!(top.is_none());
        assert_eq!(*source.comment_requests.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_placeholders_discarded_by_default() {
        let forest = CommentForest {
            comments: vec![comment("x", 3)],
            placeholders: vec![MoreComments {
                parent_id: "t3_a".to_string(),
                children: vec!["hidden".to_string()],
            }],
        };
        let source = FakeSource::new(Vec::new(), 10)
            .with_comments("a", forest)
            .with_expansion("a", vec![comment("hidden", 100)]);

        let top = CommentSelector::new(&source, false)
            .top_comment(&commented_post())
            .await
            .unwrap();
        assert_eq!(top.unwrap().id, "x");
    }

    #[tokio::test]
    async fn test_placeholders_expanded_when_enabled() {
        let forest = CommentForest {
            comments: vec![comment("x", 3)],
            placeholders: vec![MoreComments {
                parent_id: "t3_a".to_string(),
                children: vec!["hidden".to_string()],
            }],
        };
        let source = FakeSource::new(Vec::new(), 10)
            .with_comments("a", forest)
            .with_expansion("a", vec![comment("hidden", 100)]);

        let top = CommentSelector::new(&source, true)
            .top_comment(&commented_post())
            .await
            .unwrap();
        assert_eq!(top.unwrap().id, "hidden");
    }

    #[tokio::test]
    async fn test_replies_are_not_candidates() {
        let mut reply = comment("reply", 500);
        reply.parent_id = "t1_x".to_string();
        let forest = CommentForest {
            comments: vec![comment("x", 3), reply],
            placeholders: Vec::new(),
        };
        let source = FakeSource::new(Vec::new(), 10).with_comments("a", forest);

        let top = CommentSelector::new(&source, false)
            .top_comment(&commented_post())
            .await
            .unwrap();
        assert_eq!(top.unwrap().id, "x");
    }
}
