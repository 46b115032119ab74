//! Step definitions for captured emails.

use crate::bdd::fixtures::{RefCellOptionExt, TestWorld};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{then, when};
use testsession::email::{EmailQuery, EmailRecord, Mailer, OutgoingEmail, TestMailer, find_link};
use testsession::session::SessionController;

fn mailer(world: &TestWorld) -> Result<TestMailer> {
    Ok(world
        .controller
        .with_ref(SessionController::mailer)
        .context("no session has been started")??)
}

fn latest_to(world: &TestWorld, to: &str) -> Result<Option<EmailRecord>> {
    Ok(mailer(world)?.find_email(&EmailQuery::new().sent_to(to))?)
}

#[when("the application sends an email to {to:string} with subject {subject:string}")]
fn send_plain(world: &TestWorld, to: String, subject: String) -> Result<()> {
    mailer(world)?.send_plain(OutgoingEmail {
        to,
        from: "site@example.com".to_owned(),
        subject,
        body: "Hello".to_owned(),
        ..OutgoingEmail::default()
    })?;
    Ok(())
}

#[when("the application sends an HTML email to {to:string} with a link {text:string} to {href:string}")]
fn send_html_link(world: &TestWorld, to: String, text: String, href: String) -> Result<()> {
    mailer(world)?.send_html(OutgoingEmail {
        to,
        from: "site@example.com".to_owned(),
        subject: "Action required".to_owned(),
        body: format!("<p>Please <a href=\"{href}\">{text}</a> soon.</p>"),
        plain_body: Some(format!("{text}: {href}")),
        ..OutgoingEmail::default()
    })?;
    Ok(())
}

#[when("all emails are cleared")]
fn clear_emails(world: &TestWorld) -> Result<()> {
    mailer(world)?.clear_emails()?;
    Ok(())
}

#[then("the latest email to {to:string} has subject {subject:string}")]
fn latest_email_subject(world: &TestWorld, to: String, subject: String) -> Result<()> {
    let email = latest_to(world, &to)?.with_context(|| format!("no email to {to}"))?;
    ensure!(
        email.subject == subject,
        "expected subject '{subject}', got '{}'",
        email.subject
    );
    Ok(())
}

#[then("an email to {to:string} with subject matching {pattern:string} exists")]
fn email_matching_exists(world: &TestWorld, to: String, pattern: String) -> Result<()> {
    let query = EmailQuery::new().sent_to(to).with_subject(pattern);
    let found = mailer(world)?.find_email(&query)?;
    ensure!(found.is_some(), "no email matched {query:?}");
    Ok(())
}

#[then("no email to {to:string} exists")]
fn no_email_exists(world: &TestWorld, to: String) -> Result<()> {
    let found = latest_to(world, &to)?;
    ensure!(found.is_none(), "unexpected email {found:?}");
    Ok(())
}

#[then("the link {text:string} in the email to {to:string} points to {href:string}")]
fn link_points_to(world: &TestWorld, text: String, to: String, href: String) -> Result<()> {
    let email = latest_to(world, &to)?.with_context(|| format!("no email to {to}"))?;
    let link = find_link(&email.content, &text)?;
    ensure!(
        link.as_deref() == Some(href.as_str()),
        "expected link to {href}, got {link:?}"
    );
    Ok(())
}
