use chrono::{Duration, Utc};
use content_hub::storage::models::{
    Category, Comment, CommentFilter, Post, PostChanges, PostFilter,
};
use content_hub::storage::Database;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_category(id: &str, name: &str) -> Category {
    let now = Utc::now();
    Category {
        id: id.to_string(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn sample_post(id: &str, owner_id: &str, category_id: &str, theme: &str) -> Post {
    let now = Utc::now();
    Post {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        category_id: category_id.to_string(),
        theme: theme.to_string(),
        science: "physics".to_string(),
        price: 0.0,
        price_status: false,
        views: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn sample_comment(id: &str, post_id: &str, owner_id: &str) -> Comment {
    let now = Utc::now();
    Comment {
        id: id.to_string(),
        post_id: post_id.to_string(),
        owner_id: owner_id.to_string(),
        message: "Nice write-up".to_string(),
        likes: 0,
        dislikes: 0,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

// ============================================================================
// category tests
// ============================================================================

#[test]
fn test_put_and_get_category() {
    let (_dir, db) = test_db();
    db.put_category(&sample_category("cat-1", "Science")).unwrap();

    let category = db.get_category("cat-1").unwrap().expect("category should exist");
    assert_eq!(category.name, "Science");
    assert!(db.get_category("missing").unwrap().is_none());
}

#[test]
fn test_update_category() {
    let (_dir, db) = test_db();
    db.put_category(&sample_category("cat-1", "Science")).unwrap();

    let later = Utc::now() + Duration::seconds(5);
    assert!(db.update_category("cat-1", "Natural Science", later).unwrap());
    assert!(!db.update_category("missing", "x", later).unwrap());

    let category = db.get_category("cat-1").unwrap().unwrap();
    assert_eq!(category.name, "Natural Science");
    assert_eq!(category.updated_at, later);
}

#[test]
fn test_delete_category() {
    let (_dir, db) = test_db();
    db.put_category(&sample_category("cat-1", "Science")).unwrap();

    assert!(db.delete_category("cat-1").unwrap());
    assert!(!db.delete_category("cat-1").unwrap());
    assert!(db.get_category("cat-1").unwrap().is_none());
}

#[test]
fn test_list_categories_sorted_by_name() {
    let (_dir, db) = test_db();
    db.put_category(&sample_category("c", "Zoology")).unwrap();
    db.put_category(&sample_category("a", "Art")).unwrap();
    db.put_category(&sample_category("b", "Math")).unwrap();

    let names: Vec<String> = db
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Art", "Math", "Zoology"]);
}

// ============================================================================
// post tests
// ============================================================================

#[test]
fn test_put_and_get_post() {
    let (_dir, db) = test_db();
    db.put_post(&sample_post("post-1", "user-1", "cat-1", "Optics"))
        .unwrap();

    let post = db.get_post("post-1").unwrap().expect("post should exist");
    assert_eq!(post.theme, "Optics");
    assert_eq!(post.owner_id, "user-1");
    assert_eq!(post.views, 0);
}

#[test]
fn test_update_post_changes_only_given_fields() {
    let (_dir, db) = test_db();
    db.put_post(&sample_post("post-1", "user-1", "cat-1", "Optics"))
        .unwrap();

    let changes = PostChanges {
        price: Some(9.5),
        price_status: Some(true),
        theme: Some("Wave Optics".to_string()),
        ..Default::default()
    };
    assert!(db.update_post("post-1", &changes, Utc::now()).unwrap());

    let post = db.get_post("post-1").unwrap().unwrap();
    assert_eq!(post.theme, "Wave Optics");
    assert_eq!(post.price, 9.5);
    assert!(post.price_status);
    assert_eq!(post.science, "physics");
    assert_eq!(post.category_id, "cat-1");
}

#[test]
fn test_delete_post_is_soft() {
    let (_dir, db) = test_db();
    db.put_post(&sample_post("post-1", "user-1", "cat-1", "Optics"))
        .unwrap();

    assert!(db.delete_post("post-1", Utc::now()).unwrap());
    assert!(!db.delete_post("post-1", Utc::now()).unwrap());

    assert!(db.get_post("post-1").unwrap().is_none());
    let raw = db.get_post_including_deleted("post-1").unwrap().unwrap();
    assert!(raw.is_deleted());

    // Deleted posts cannot be edited
    let changes = PostChanges {
        theme: Some("x".to_string()),
        ..Default::default()
    };
    assert!(!db.update_post("post-1", &changes, Utc::now()).unwrap());
}

#[test]
fn test_record_post_view() {
    let (_dir, db) = test_db();
    db.put_post(&sample_post("post-1", "user-1", "cat-1", "Optics"))
        .unwrap();

    assert!(db.record_post_view("post-1").unwrap());
    assert!(db.record_post_view("post-1").unwrap());
    assert!(!db.record_post_view("missing").unwrap());

    assert_eq!(db.get_post("post-1").unwrap().unwrap().views, 2);
}

#[test]
fn test_list_posts_filters() {
    let (_dir, db) = test_db();
    let base = Utc::now();
    let mut first = sample_post("p1", "user-1", "cat-1", "Quantum Field Theory");
    first.created_at = base;
    let mut second = sample_post("p2", "user-2", "cat-1", "Classical Mechanics");
    second.created_at = base + Duration::seconds(1);
    let mut third = sample_post("p3", "user-1", "cat-2", "Quantum Computing");
    third.created_at = base + Duration::seconds(2);
    let deleted = sample_post("p4", "user-1", "cat-1", "Quantum Gravity");

    for post in [&first, &second, &third, &deleted] {
        db.put_post(post).unwrap();
    }
    db.delete_post("p4", Utc::now()).unwrap();

    let all = db.list_posts(&PostFilter::default()).unwrap();
    let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    let by_owner = db
        .list_posts(&PostFilter {
            owner_id: Some("user-1".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_owner.len(), 2);

    let by_category = db
        .list_posts(&PostFilter {
            category_id: Some("cat-1".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_category.len(), 2);

    let search = db
        .list_posts(&PostFilter {
            search: Some("quantum THEORY".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].id, "p1");
}

// ============================================================================
// comment tests
// ============================================================================

#[test]
fn test_put_and_get_comment() {
    let (_dir, db) = test_db();
    db.put_comment(&sample_comment("c1", "post-1", "user-1"))
        .unwrap();

    let comment = db.get_comment("c1").unwrap().expect("comment should exist");
    assert_eq!(comment.post_id, "post-1");
    assert_eq!(comment.likes, 0);
    assert_eq!(comment.dislikes, 0);
}

#[test]
fn test_update_comment_message_keeps_counters() {
    let (_dir, db) = test_db();
    let mut comment = sample_comment("c1", "post-1", "user-1");
    comment.likes = 3;
    comment.dislikes = 1;
    db.put_comment(&comment).unwrap();

    assert!(db
        .update_comment_message("c1", "Edited", Utc::now())
        .unwrap());
    assert!(!db
        .update_comment_message("missing", "Edited", Utc::now())
        .unwrap());

    let comment = db.get_comment("c1").unwrap().unwrap();
    assert_eq!(comment.message, "Edited");
    assert_eq!(comment.likes, 3);
    assert_eq!(comment.dislikes, 1);
}

#[test]
fn test_delete_comment_is_soft() {
    let (_dir, db) = test_db();
    db.put_comment(&sample_comment("c1", "post-1", "user-1"))
        .unwrap();

    assert!(db.delete_comment("c1", Utc::now()).unwrap());
    assert!(db.get_comment("c1").unwrap().is_none());
    assert!(db
        .get_comment_including_deleted("c1")
        .unwrap()
        .unwrap()
        .is_deleted());
    assert!(!db.delete_comment("c1", Utc::now()).unwrap());
}

#[test]
fn test_list_comments_by_post_and_owner() {
    let (_dir, db) = test_db();
    let base = Utc::now();
    let mut a = sample_comment("a", "post-1", "user-1");
    a.created_at = base + Duration::seconds(2);
    let mut b = sample_comment("b", "post-1", "user-2");
    b.created_at = base;
    let c = sample_comment("c", "post-2", "user-1");
    let d = sample_comment("d", "post-1", "user-1");

    for comment in [&a, &b, &c, &d] {
        db.put_comment(comment).unwrap();
    }
    db.delete_comment("d", Utc::now()).unwrap();

    let on_post: Vec<String> = db
        .list_comments(&CommentFilter {
            post_id: Some("post-1".to_string()),
            ..Default::default()
        })
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(on_post, vec!["b", "a"]);

    let by_owner = db
        .list_comments(&CommentFilter {
            owner_id: Some("user-1".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_owner.len(), 2);

    let both = db
        .list_comments(&CommentFilter {
            owner_id: Some("user-1".to_string()),
            post_id: Some("post-1".to_string()),
        })
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].id, "a");

    assert!(db
        .list_comments(&CommentFilter {
            post_id: Some("no-post".to_string()),
            ..Default::default()
        })
        .unwrap()
        .is_empty());
}

#[test]
fn test_put_comment_twice_indexes_once() {
    let (_dir, db) = test_db();
    let comment = sample_comment("c1", "post-1", "user-1");
    db.put_comment(&comment).unwrap();
    db.put_comment(&comment).unwrap();

    assert_eq!(db.get_comments_by_post("post-1").unwrap().len(), 1);
}

// ============================================================================
// admin tests
// ============================================================================

#[test]
fn test_purge_all() {
    let (_dir, db) = test_db();
    db.put_category(&sample_category("cat-1", "Science")).unwrap();
    db.put_post(&sample_post("p1", "u1", "cat-1", "Optics"))
        .unwrap();
    db.put_comment(&sample_comment("c1", "p1", "u1")).unwrap();
    db.put_comment(&sample_comment("c2", "p1", "u2")).unwrap();

    let stats = db.purge_all().unwrap();
    assert_eq!(stats.categories, 1);
    assert_eq!(stats.posts, 1);
    assert_eq!(stats.comments, 2);
    assert_eq!(stats.votes, 0);

    assert!(db.get_all_posts().unwrap().is_empty());
    assert!(db.get_all_comments().unwrap().is_empty());
    assert!(db.get_comments_by_post("p1").unwrap().is_empty());
}
