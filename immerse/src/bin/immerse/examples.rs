use crate::commands::{feed, post, social};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "feed",
            groups: feed::EXAMPLES,
        },
        CommandExample {
            name: "post",
            groups: post::POST_EXAMPLES,
        },
        CommandExample {
            name: "comment",
            groups: post::COMMENT_EXAMPLES,
        },
        CommandExample {
            name: "users",
            groups: social::USER_EXAMPLES,
        },
    ]
}
