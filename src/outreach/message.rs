//! Personalized message assembly

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::Address;
use serde::Deserialize;
use tracing::{info, warn};

use crate::outreach::contact::{Category, Contact};
use crate::outreach::error::BuildError;
use crate::outreach::template::{self, Placeholders, TemplateSet};

/// Per-category campaign content
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryCampaign {
    /// Substituted for `{event_name}`
    pub event_name: String,
    /// Subject line; may itself contain placeholders
    pub subject: String,
    /// Brochure attached to every message of this category
    #[serde(default)]
    pub attachment: Option<PathBuf>,
}

/// Campaign-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Campaign {
    /// Copy address added to every message
    pub cc: Option<String>,
    pub mechanical: CategoryCampaign,
    pub cs: CategoryCampaign,
    pub general: CategoryCampaign,
}

impl Campaign {
    pub fn for_category(&self, category: Category) -> &CategoryCampaign {
        match category {
            Category::Mechanical => &self.mechanical,
            Category::Cs => &self.cs,
            Category::General => &self.general,
        }
    }
}

impl Default for Campaign {
    fn default() -> Self {
        let equinox = CategoryCampaign {
            event_name: "Equinox '26".to_owned(),
            subject: "Equinox Sponsorship 2026 – VIT Vellore".to_owned(),
            attachment: Some(PathBuf::from("brochures/Equinox '26.pdf")),
        };

        Self {
            cc: Some("robovitics@vit.ac.in".to_owned()),
            mechanical: CategoryCampaign {
                event_name: "Vortex360 '26".to_owned(),
                subject: "Vortex 360 Sponsorship 2026 – VIT Vellore".to_owned(),
                attachment: Some(PathBuf::from("brochures/Vortex360 '26.pdf")),
            },
            cs: equinox.clone(),
            general: equinox,
        }
    }
}

/// Identity the messages are sent as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: String,
    pub address: String,
}

/// A file attached verbatim to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// Read an attachment, or `None` (with a warning) if it cannot be read
    pub fn load(path: &Path) -> Option<Self> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Attachment {} not found, sending without it", path.display());
                return None;
            }
            Err(e) => {
                warn!("Error attaching file {}: {e}", path.display());
                return None;
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_owned());

        Some(Self { filename, content })
    }
}

/// Everything that goes into one email, before MIME encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to_name: String,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

impl RenderedEmail {
    /// Pack into a MIME message sent by `sender`
    pub fn into_message(self, sender: &Sender) -> Result<Message, BuildError> {
        let from = Mailbox::new(Some(sender.name.clone()), parse_address(&sender.address)?);
        let to = Mailbox::new(Some(self.to_name), parse_address(&self.to)?);

        let mut builder = Message::builder().from(from).to(to).subject(self.subject);
        if let Some(cc) = &self.cc {
            builder = builder.cc(Mailbox::new(None, parse_address(cc)?));
        }

        let body = SinglePart::html(self.html);
        let message = match self.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse("application/octet-stream")
                    .map_err(|e| BuildError::ContentType(e.to_string()))?;
                let part =
                    MimeAttachment::new(attachment.filename).body(attachment.content, content_type);
                builder.multipart(MultiPart::mixed().singlepart(body).singlepart(part))?
            }
            None => builder.singlepart(body)?,
        };

        Ok(message)
    }
}

fn parse_address(address: &str) -> Result<Address, BuildError> {
    address.parse().map_err(|source| BuildError::Address {
        address: address.to_owned(),
        source,
    })
}

/// Builds the outgoing message for a contact
#[derive(Debug, Clone, Copy)]
pub struct MessageBuilder<'a> {
    templates: &'a TemplateSet,
    campaign: &'a Campaign,
    sender: &'a Sender,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(templates: &'a TemplateSet, campaign: &'a Campaign, sender: &'a Sender) -> Self {
        Self {
            templates,
            campaign,
            sender,
        }
    }

    /// Render subject, body and attachment for a contact
    pub fn render(&self, contact: &Contact) -> Result<RenderedEmail, BuildError> {
        let content = self.campaign.for_category(contact.category);
        let values = Placeholders {
            company_name: &contact.organization,
            poc_name: &contact.name,
            event_name: &content.event_name,
            sender_name: &self.sender.name,
            sender_email: &self.sender.address,
        };

        let subject = template::render(&content.subject, &values)?;
        let html = self.templates.render_html(contact.category, &values)?;
        let attachment = content.attachment.as_deref().and_then(|path| {
            let loaded = Attachment::load(path);
            if let Some(a) = &loaded {
                info!("Attached file: {}", a.filename);
            }
            loaded
        });

        Ok(RenderedEmail {
            to_name: contact.name.clone(),
            to: contact.email.clone(),
            cc: self.campaign.cc.clone(),
            subject,
            html,
            attachment,
        })
    }

    /// Render and encode the message for a contact
    pub fn build(&self, contact: &Contact) -> Result<Message, BuildError> {
        self.render(contact)?.into_message(self.sender)
    }
}
