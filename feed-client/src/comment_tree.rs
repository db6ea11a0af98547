//! Поиск и неизменяемые правки дерева комментариев.
//!
//! Каждая правка возвращает новый список верхнего уровня: узлы на пути от
//! цели до корня пересобираются, все остальные поддеревья переиспользуются
//! через `Arc`. Если цель не найдена, возвращается `None` и дерево не трогается.

use std::sync::Arc;

use crate::models::{Comment, EntityId};

/// Поиск в глубину в прямом порядке: сам узел, затем его ответы, затем соседи.
pub(crate) fn find<'a>(comments: &'a [Arc<Comment>], id: &EntityId) -> Option<&'a Arc<Comment>> {
    for node in comments {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find(&node.replies, id) {
            return Some(found);
        }
    }
    None
}

pub(crate) fn update<F>(comments: &[Arc<Comment>], id: &EntityId, f: F) -> Option<Vec<Arc<Comment>>>
where
    F: FnOnce(&Comment) -> Comment,
{
    let mut f = Some(f);
    update_in(comments, id, &mut f)
}

fn update_in<F>(
    comments: &[Arc<Comment>],
    id: &EntityId,
    f: &mut Option<F>,
) -> Option<Vec<Arc<Comment>>>
where
    F: FnOnce(&Comment) -> Comment,
{
    for (index, node) in comments.iter().enumerate() {
        let replacement = if &node.id == id {
            let f = f.take()?;
            f(node)
        } else if let Some(replies) = update_in(&node.replies, id, f) {
            node.with_replies(replies)
        } else {
            continue;
        };

        let mut rebuilt = comments.to_vec();
        rebuilt[index] = Arc::new(replacement);
        return Some(rebuilt);
    }
    None
}

/// Добавляет `child` последним ответом узла `parent_id` на любой глубине.
pub(crate) fn append_reply(
    comments: &[Arc<Comment>],
    parent_id: &EntityId,
    child: Arc<Comment>,
) -> Option<Vec<Arc<Comment>>> {
    update(comments, parent_id, |parent| {
        let mut replies = parent.replies.clone();
        replies.push(child);
        parent.with_replies(replies)
    })
}

/// Заменяет узел `id` на месте, сохраняя его позицию.
pub(crate) fn replace(
    comments: &[Arc<Comment>],
    id: &EntityId,
    replacement: Comment,
) -> Option<Vec<Arc<Comment>>> {
    update(comments, id, |_| replacement)
}

/// Удаляет узел `id` вместе с его поддеревом, где бы он ни находился.
pub(crate) fn remove(comments: &[Arc<Comment>], id: &EntityId) -> Option<Vec<Arc<Comment>>> {
    for (index, node) in comments.iter().enumerate() {
        if &node.id == id {
            let mut rebuilt = comments.to_vec();
            rebuilt.remove(index);
            return Some(rebuilt);
        }
        if let Some(replies) = remove(&node.replies, id) {
            let mut rebuilt = comments.to_vec();
            rebuilt[index] = Arc::new(node.with_replies(replies));
            return Some(rebuilt);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappers::map_user;

    fn node(id: i64, replies: Vec<Arc<Comment>>) -> Arc<Comment> {
        Arc::new(Comment {
            id: EntityId::Confirmed(id),
            author: map_user("tester"),
            content: format!("c{id}"),
            timestamp: "Jan 1, 12:00 AM".to_string(),
            likes: 0,
            liked_by_me: false,
            replies,
        })
    }

    // 1 ─┬─ 2 ── 3
    //    └─ 4
    // 5
    fn sample() -> Vec<Arc<Comment>> {
        vec![
            node(1, vec![node(2, vec![node(3, vec![])]), node(4, vec![])]),
            node(5, vec![]),
        ]
    }

    fn ids(comments: &[Arc<Comment>]) -> Vec<EntityId> {
        comments.iter().map(|c| c.id).collect()
    }

    #[test]
    fn find_walks_tree_in_pre_order() {
        let tree = sample();
        let found = find(&tree, &EntityId::Confirmed(3)).expect("deep node must be found");
        assert_eq!(found.content, "c3");
        assert!(find(&tree, &EntityId::Confirmed(42)).is_none());
        assert!(find(&tree, &EntityId::Pending(3)).is_none());
    }

    #[test]
    fn update_rebuilds_only_path_to_root() {
        let tree = sample();
        let updated = update(&tree, &EntityId::Confirmed(3), Comment::liked)
            .expect("node must be updated");

        let target = &updated[0].replies[0].replies[0];
        assert_eq!(target.likes, 1);
        assert!(target.liked_by_me);

        assert!(!Arc::ptr_eq(&updated[0], &tree[0]));
        assert!(!Arc::ptr_eq(&updated[0].replies[0], &tree[0].replies[0]));
        assert!(Arc::ptr_eq(&updated[0].replies[1], &tree[0].replies[1]));
        assert!(Arc::ptr_eq(&updated[1], &tree[1]));

        assert_eq!(updated[0].content, tree[0].content);
        assert_eq!(tree[0].replies[0].replies[0].likes, 0);
    }

    #[test]
    fn update_returns_none_for_missing_node() {
        let tree = sample();
        assert!(update(&tree, &EntityId::Confirmed(99), Comment::liked).is_none());
    }

    #[test]
    fn append_reply_adds_last_child_at_any_depth() {
        let tree = sample();
        let updated = append_reply(&tree, &EntityId::Confirmed(2), node(6, vec![]))
            .expect("parent must exist");
        assert_eq!(
            ids(&updated[0].replies[0].replies),
            vec![EntityId::Confirmed(3), EntityId::Confirmed(6)]
        );

        let updated = append_reply(&updated, &EntityId::Confirmed(3), node(7, vec![]))
            .expect("deep parent must exist");
        assert_eq!(
            ids(&updated[0].replies[0].replies[0].replies),
            vec![EntityId::Confirmed(7)]
        );
    }

    #[test]
    fn replace_keeps_position() {
        let tree = sample();
        let replacement = Comment {
            content: "fresh".to_string(),
            ..(*node(40, vec![])).clone()
        };
        let updated = replace(&tree, &EntityId::Confirmed(4), replacement).expect("must replace");
        assert_eq!(
            ids(&updated[0].replies),
            vec![EntityId::Confirmed(2), EntityId::Confirmed(40)]
        );
        assert_eq!(updated[0].replies[1].content, "fresh");
    }

    #[test]
    fn remove_prunes_nested_node() {
        let tree = sample();
        let updated = remove(&tree, &EntityId::Confirmed(3)).expect("must remove");
        assert!(updated[0].replies[0].replies.is_empty());
        assert_eq!(ids(&updated), ids(&tree));

        let updated = remove(&updated, &EntityId::Confirmed(5)).expect("must remove top-level");
        assert_eq!(ids(&updated), vec![EntityId::Confirmed(1)]);

        assert!(remove(&updated, &EntityId::Confirmed(5)).is_none());
    }
}
