use redb::TableDefinition;

/// Categories: uuid -> Category (msgpack)
pub const CATEGORIES: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");

/// Posts: uuid -> Post (msgpack)
pub const POSTS: TableDefinition<&str, &[u8]> = TableDefinition::new("posts");

/// Comments: uuid -> Comment (msgpack), counters included
pub const COMMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("comments");

/// Post index: post uuid -> msgpack Vec of comment UUIDs
pub const POST_COMMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("post_comments");

/// Votes: "comment_id/post_id/owner_id" -> Vote (msgpack)
pub const VOTES: TableDefinition<&str, &[u8]> = TableDefinition::new("votes");
