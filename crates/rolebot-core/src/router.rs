//! Command catalogue and dispatch plumbing.
//!
//! Commands are registered once into an ordered catalogue; the catalogue
//! order is the help-listing order. Guards are an explicit chain evaluated
//! by the dispatcher before the handler runs, each one short-circuiting.

/// Authorization checks applied in order before a command handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    /// Origin chat must be a group/supergroup listed in the group registry.
    /// Failure drops the update silently.
    RegisteredGroup,
    /// Invoking user must be an administrator or the owner of the chat.
    /// Failure gets a rejection reply.
    GroupAdmin,
}

/// Outcome of a guard check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardVerdict {
    Pass,
    /// Ignore the update entirely, no reply.
    Drop,
    /// Reply with a rejection message and stop.
    Reject(String),
}

/// Which handler a command maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Help,
    About,
    Add,
    Del,
    Get,
    Me,
    All,
    Create,
    Purge,
}

impl CommandKind {
    /// Commands that take exactly one `@role` argument.
    pub fn takes_role_arg(self) -> bool {
        matches!(
            self,
            CommandKind::Add
                | CommandKind::Del
                | CommandKind::Get
                | CommandKind::Create
                | CommandKind::Purge
        )
    }

    /// The three unauthenticated commands also answer the Telegram-native
    /// `/command` form.
    fn accepts_slash(self) -> bool {
        matches!(
            self,
            CommandKind::Start | CommandKind::Help | CommandKind::About
        )
    }
}

/// One registered command.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub hidden: bool,
    pub guards: &'static [Guard],
    pub kind: CommandKind,
}

const GROUP: &[Guard] = &[Guard::RegisteredGroup];
const GROUP_ADMIN: &[Guard] = &[Guard::RegisteredGroup, Guard::GroupAdmin];

/// Build the command catalogue. Registration order is help-listing order.
pub fn catalogue() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "start",
            usage: "",
            help: "",
            hidden: true,
            guards: &[],
            kind: CommandKind::Start,
        },
        CommandSpec {
            name: "help",
            usage: "",
            help: "",
            hidden: true,
            guards: &[],
            kind: CommandKind::Help,
        },
        CommandSpec {
            name: "about",
            usage: "",
            help: "",
            hidden: true,
            guards: &[],
            kind: CommandKind::About,
        },
        CommandSpec {
            name: "add",
            usage: "<role>",
            help: "Add role",
            hidden: false,
            guards: GROUP,
            kind: CommandKind::Add,
        },
        CommandSpec {
            name: "del",
            usage: "<role>",
            help: "Delete role",
            hidden: false,
            guards: GROUP,
            kind: CommandKind::Del,
        },
        CommandSpec {
            name: "get",
            usage: "<role>",
            help: "Get role members",
            hidden: false,
            guards: GROUP,
            kind: CommandKind::Get,
        },
        CommandSpec {
            name: "me",
            usage: "",
            help: "Get your roles",
            hidden: false,
            guards: GROUP,
            kind: CommandKind::Me,
        },
        CommandSpec {
            name: "all",
            usage: "",
            help: "Get group roles (admin only)",
            hidden: false,
            guards: GROUP_ADMIN,
            kind: CommandKind::All,
        },
        CommandSpec {
            name: "create",
            usage: "<role>",
            help: "Create group role (admin only)",
            hidden: false,
            guards: GROUP_ADMIN,
            kind: CommandKind::Create,
        },
        CommandSpec {
            name: "purge",
            usage: "<role>",
            help: "Purge group role (admin only)",
            hidden: false,
            guards: GROUP_ADMIN,
            kind: CommandKind::Purge,
        },
    ]
}

/// A parsed command invocation.
#[derive(Clone, Debug)]
pub struct Invocation<'a> {
    pub spec: &'a CommandSpec,
    pub args: Vec<String>,
}

/// Match `text` against the catalogue.
///
/// Returns `None` for plain messages and for unknown command names; both
/// fall through to mention resolution.
pub fn parse<'a>(text: &str, prefix: &str, catalogue: &'a [CommandSpec]) -> Option<Invocation<'a>> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;

    let (name, slash) = if let Some(rest) = first.strip_prefix(prefix) {
        (rest, false)
    } else if let Some(rest) = first.strip_prefix('/') {
        (rest, true)
    } else {
        return None;
    };

    // Telegram may send `/cmd@botname`.
    let name = name.split('@').next().unwrap_or("").to_lowercase();

    let spec = catalogue.iter().find(|spec| spec.name == name)?;
    if slash && !spec.kind.accepts_slash() {
        return None;
    }

    Some(Invocation {
        spec,
        args: tokens.map(str::to_string).collect(),
    })
}
