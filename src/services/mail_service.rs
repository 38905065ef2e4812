use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::job_service::JobService;
use super::subscriber_service::SubscriberService;
use super::ServiceResult;
use crate::database::models::{Job, Subscriber};
use crate::database::Record;
use crate::mail::{Email, Mailer};

const DIGEST_SUBJECT: &str = "New jobs matching your skills";

#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    pub subscribers: usize,
    pub sent: usize,
}

/// Weekly digest: one message per subscriber listing the open jobs that share a skill with them
#[derive(Clone)]
pub struct MailService {
    subscribers: SubscriberService,
    jobs: JobService,
    mailer: Arc<dyn Mailer>,
}

impl MailService {
    pub fn new(subscribers: SubscriberService, jobs: JobService, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            subscribers,
            jobs,
            mailer,
        }
    }

    /// Stops at the first delivery failure; subscribers after it get nothing this run.
    pub async fn send_digest(&self) -> ServiceResult<DigestReport> {
        let subscribers = self.subscribers.all().await?;
        let mut sent = 0;

        for subscriber in &subscribers {
            let jobs = self.jobs.open_matching(&subscriber.data.skills).await?;
            if jobs.is_empty() {
                debug!("no open jobs for subscriber {}", subscriber.data.email);
                continue;
            }
            self.mailer.send(render_digest(&subscriber.data, &jobs)).await?;
            sent += 1;
        }

        info!("job digest sent to {} of {} subscribers", sent, subscribers.len());
        Ok(DigestReport {
            subscribers: subscribers.len(),
            sent,
        })
    }
}

fn render_digest(subscriber: &Subscriber, jobs: &[Record<Job>]) -> Email {
    let mut text = format!("Hello {},\n\nThese open positions match your skills:\n\n", subscriber.name);
    let mut html = format!(
        "<p>Hello {},</p><p>These open positions match your skills:</p><ul>",
        escape_html(&subscriber.name)
    );

    for job in jobs {
        let job = &job.data;
        let salary = format_salary(job.salary);
        let skills = job.skills.join(", ");
        text.push_str(&format!("- {} at {}: {} ({})\n", job.name, job.company.name, salary, skills));
        html.push_str(&format!(
            "<li><strong>{}</strong> at {}<br/>Salary: {}<br/>Skills: {}</li>",
            escape_html(&job.name),
            escape_html(&job.company.name),
            salary,
            escape_html(&skills)
        ));
    }
    html.push_str("</ul>");

    Email {
        to: subscriber.email.clone(),
        to_name: subscriber.name.clone(),
        subject: DIGEST_SUBJECT.to_string(),
        text,
        html,
    }
}

/// `1000000` -> `1,000,000 đ`
pub fn format_salary(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{} đ", grouped)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
