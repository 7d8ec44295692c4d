//! Membership report issues.

use roster_core::Member;

/// What a membership report tells a human.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueReport {
    pub organization: String,
    /// Unknown members whose identity was guessed; email attached.
    pub guessed: Vec<Member>,
    /// Unknown members whose profile names the corporation as employer.
    pub known_employer: Vec<Member>,
    /// Unknown members nothing matched.
    pub unknown: Vec<Member>,
    /// Records removed in this run after their grace period ran out.
    pub removed: Vec<Member>,
}

impl IssueReport {
    pub fn is_empty(&self) -> bool {
        self.guessed.is_empty()
            && self.known_employer.is_empty()
            && self.unknown.is_empty()
            && self.removed.is_empty()
    }

    /// Sort every list by username.
    pub(crate) fn sort(&mut self) {
        for list in [
            &mut self.guessed,
            &mut self.known_employer,
            &mut self.unknown,
            &mut self.removed,
        ] {
            list.sort_by_key(Member::key);
        }
    }
}

/// Title and body of an issue or comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedIssue {
    pub title: String,
    pub body: String,
}

/// Turns a report into issue text.
pub trait IssueRenderer: Send + Sync {
    fn render(&self, title: &str, report: &IssueReport) -> RenderedIssue;
}

/// Markdown lists, one section per non-empty category.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainIssueRenderer;

impl PlainIssueRenderer {
    fn section(body: &mut String, heading: &str, members: &[Member], with_email: bool) {
        if members.is_empty() {
            return;
        }
        body.push_str(&format!("\n### {heading} ({})\n\n", members.len()));
        for member in members {
            match member.directory_email().filter(|_| with_email) {
                Some(email) => {
                    body.push_str(&format!("- @{} ({email})\n", member.platform_username()))
                }
                None => body.push_str(&format!("- @{}\n", member.platform_username())),
            }
        }
    }
}

impl IssueRenderer for PlainIssueRenderer {
    fn render(&self, title: &str, report: &IssueReport) -> RenderedIssue {
        let mut body = format!(
            "Membership report for the `{}` organization.\n",
            report.organization
        );
        Self::section(&mut body, "Guessed identities", &report.guessed, true);
        Self::section(
            &mut body,
            "Employer matches, identity unknown",
            &report.known_employer,
            false,
        );
        Self::section(&mut body, "Unknown members", &report.unknown, false);
        Self::section(&mut body, "Removed after grace period", &report.removed, true);

        RenderedIssue {
            title: title.to_string(),
            body,
        }
    }
}
