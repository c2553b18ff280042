use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Role, VoteDirection};

pub const DEFAULT_CATEGORY: &str = "general";

/// Derived vote counts for one item, plus the requesting user's own vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
    pub score: i64,
    pub user_vote: Option<VoteDirection>,
}

impl VoteTally {
    pub fn new(upvotes: u32, downvotes: u32, user_vote: Option<VoteDirection>) -> Self {
        Self {
            upvotes,
            downvotes,
            score: i64::from(upvotes) - i64::from(downvotes),
            user_vote,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    pub id: Uuid,
    pub author: Author,
    pub content: String,
    pub category: String,
    pub comment_count: u32,
    pub votes: VoteTally,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: Author,
    pub content: String,
    pub votes: VoteTally,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub author: Author,
    pub content: String,
    pub votes: VoteTally,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_up_minus_down() {
        let tally = VoteTally::new(2, 5, Some(VoteDirection::Down));
        assert_eq!(tally.score, -3);
    }
}
