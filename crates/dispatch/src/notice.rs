use std::fmt;

use threadwatch_core::NotificationIntent;

pub const NEW_THREAD_COLOR: u32 = 0x0099ff;
pub const UPDATE_COLOR: u32 = 0xffd433;

/// Logical destination of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    NewThreads,
    ThreadUpdates,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewThreads => f.write_str("new-threads"),
            Self::ThreadUpdates => f.write_str("thread-updates"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
}

/// Transport-neutral rendering of one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub description: Option<String>,
    pub field: Option<NoticeField>,
}

impl Notice {
    /// Renders `intent` for `board` and picks its channel.
    pub fn render(board: &str, intent: &NotificationIntent) -> (Channel, Notice) {
        match intent {
            NotificationIntent::NewThread {
                id,
                link,
                subject,
                content,
            } => (
                Channel::NewThreads,
                Notice {
                    title: format!("/{board}/ new thread [{id}] {subject}"),
                    url: link.clone(),
                    color: NEW_THREAD_COLOR,
                    description: None,
                    field: labeled(subject, content),
                },
            ),
            NotificationIntent::UpdatedThread {
                id,
                link,
                subject,
                reply_count,
                last_reply_author,
                last_reply_content,
            } => (
                Channel::ThreadUpdates,
                Notice {
                    title: format!("/{board}/ update: [{id}] {subject}"),
                    url: link.clone(),
                    color: UPDATE_COLOR,
                    description: Some(format!("replies: [{reply_count}]")),
                    field: if last_reply_author.is_empty() {
                        None
                    } else {
                        labeled(&format!("[{last_reply_author}]"), last_reply_content)
                    },
                },
            ),
        }
    }
}

fn labeled(name: &str, value: &str) -> Option<NoticeField> {
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some(NoticeField {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_intent(subject: &str, content: &str) -> NotificationIntent {
        NotificationIntent::NewThread {
            id: 42,
            link: "https://boards.example.org/biz/thread/42".to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn new_thread_notice() {
        let (channel, notice) = Notice::render("biz", &new_intent("ABC coin", "thoughts?"));
        assert_eq!(channel, Channel::NewThreads);
        assert_eq!(notice.title, "/biz/ new thread [42] ABC coin");
        assert_eq!(notice.url, "https://boards.example.org/biz/thread/42");
        assert_eq!(notice.color, NEW_THREAD_COLOR);
        assert!(notice.description.is_none());
        assert_eq!(
            notice.field,
            Some(NoticeField {
                name: "ABC coin".to_string(),
                value: "thoughts?".to_string(),
            })
        );
    }

    #[test]
    fn new_thread_without_subject_has_no_field() {
        let (_, notice) = Notice::render("biz", &new_intent("", "abc in the body"));
        assert_eq!(notice.title, "/biz/ new thread [42] ");
        assert!(notice.field.is_none());
    }

    #[test]
    fn update_notice() {
        let intent = NotificationIntent::UpdatedThread {
            id: 7,
            link: "https://boards.example.org/biz/thread/7#pc9".to_string(),
            subject: "ABC".to_string(),
            reply_count: 31,
            last_reply_author: "Anonymous".to_string(),
            last_reply_content: "abc to the moon".to_string(),
        };
        let (channel, notice) = Notice::render("biz", &intent);
        assert_eq!(channel, Channel::ThreadUpdates);
        assert_eq!(notice.title, "/biz/ update: [7] ABC");
        assert_eq!(notice.color, UPDATE_COLOR);
        assert_eq!(notice.description.as_deref(), Some("replies: [31]"));
        let field = notice.field.unwrap();
        assert_eq!(field.name, "[Anonymous]");
        assert_eq!(field.value, "abc to the moon");
    }

    #[test]
    fn update_without_reply_author_has_no_field() {
        let intent = NotificationIntent::UpdatedThread {
            id: 7,
            link: String::new(),
            subject: String::new(),
            reply_count: 0,
            last_reply_author: String::new(),
            last_reply_content: "abc".to_string(),
        };
        let (_, notice) = Notice::render("biz", &intent);
        assert!(notice.field.is_none());
    }
}
