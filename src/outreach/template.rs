//! Email templates and placeholder substitution

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{info, warn};

use crate::outreach::contact::Category;
use crate::outreach::error::TemplateError;

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct Placeholders<'a> {
    pub company_name: &'a str,
    pub poc_name: &'a str,
    pub event_name: &'a str,
    pub sender_name: &'a str,
    pub sender_email: &'a str,
}

impl Placeholders<'_> {
    pub const KEYS: [&'static str; 5] = [
        "company_name",
        "poc_name",
        "event_name",
        "sender_name",
        "sender_email",
    ];

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "company_name" => Some(self.company_name),
            "poc_name" => Some(self.poc_name),
            "event_name" => Some(self.event_name),
            "sender_name" => Some(self.sender_name),
            "sender_email" => Some(self.sender_email),
            _ => None,
        }
    }
}

/// Substitute `{key}` placeholders.
///
/// `{{` and `}}` produce literal braces. Any key outside
/// [`Placeholders::KEYS`] is an error, as is an unterminated `{` or a lone `}`.
pub fn render(template: &str, values: &Placeholders<'_>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let consumed = if tail.starts_with("{{") {
            out.push('{');
            2
        } else if tail.starts_with("}}") {
            out.push('}');
            2
        } else if tail.starts_with('}') {
            return Err(TemplateError::UnmatchedClose(offset + pos));
        } else {
            let close = tail
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + pos))?;
            let key = &tail[1..close];
            let value = values
                .lookup(key)
                .ok_or_else(|| TemplateError::UnknownPlaceholder(key.to_owned()))?;
            out.push_str(value);
            close + 1
        };

        offset += pos + consumed;
        rest = &tail[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Convert a plain-text email into a styled HTML document.
///
/// Blank lines separate paragraphs; single newlines become `<br>`.
/// CRLF line endings are treated as plain newlines.
pub fn text_to_html(text: &str) -> String {
    let body = text
        .replace("\r\n", "\n")
        .replace("\n\n", "</p><p>")
        .replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        p {{ margin-bottom: 1em; }}
        strong {{ color: #2c3e50; }}
    </style>
</head>
<body>
    <p>{body}</p>
</body>
</html>
"#
    )
}

/// Built-in plain template for categories without template files
pub fn default_template(category: Category) -> String {
    let focus_area = match category {
        Category::Mechanical => "CAD, mechanical design, and engineering innovation",
        Category::Cs => "software development, AI/ML, and digital innovation",
        Category::General => "technology innovation and community engagement",
    };

    format!(
        "Dear {{poc_name}},

I hope this email finds you well. My name is {{sender_name}}, and I'm reaching out regarding an exciting sponsorship opportunity with {{event_name}}, our upcoming hackathon focused on {focus_area}.

Event Overview:
- Event Name: {{event_name}}
- Focus Area: {focus_area}
- Participants: 200+ talented students and professionals
- Duration: 48-hour intensive coding and innovation event

Why Partner with Us:
- Direct access to emerging talent in technology
- Brand visibility among next-generation innovators
- Opportunity to showcase your company's cutting-edge solutions
- Networking with industry leaders and academic institutions

We believe in flexible sponsorship packages that align with your marketing objectives and budget. Our team is open to discussing various partnership levels and benefits that would be most valuable for {{company_name}}.

We would love to schedule a brief call to discuss how {{company_name}} can be part of this exciting event. Are you available for a 15-minute conversation this week to explore this opportunity?

Best regards,
{{sender_name}}
{{event_name}} Sponsorship Team
Email: {{sender_email}}
"
    )
}

/// Template files found for one category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTemplate {
    pub text: Option<String>,
    pub html: Option<String>,
}

/// Template source chosen for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource<'a> {
    /// Styled template used as-is
    Html(&'a str),
    /// Plain template, converted to HTML after rendering
    Text(&'a str),
}

/// Templates for every category, loaded once at startup
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<Category, CategoryTemplate>,
    defaults: HashMap<Category, String>,
}

impl TemplateSet {
    /// Templates that only use the built-in defaults
    pub fn builtin() -> Self {
        Self::from_templates(HashMap::new())
    }

    pub fn from_templates(templates: HashMap<Category, CategoryTemplate>) -> Self {
        let defaults = Category::ALL
            .into_iter()
            .map(|category| (category, default_template(category)))
            .collect();
        Self {
            templates,
            defaults,
        }
    }

    /// Load `<category>_template.txt` and `<category>_template.html` from `dir`.
    ///
    /// Missing files are fine; a file that cannot be read as UTF-8 text is
    /// logged and treated as missing. A category with neither file falls back
    /// to the built-in template.
    pub fn load(dir: &Path) -> Self {
        let mut templates = HashMap::new();

        for category in Category::ALL {
            let stem = category.template_stem();
            let text = read_optional(&dir.join(format!("{stem}_template.txt")));
            let html = read_optional(&dir.join(format!("{stem}_template.html")));

            if text.is_some() {
                info!("Loaded text template for {category} category");
            }
            if html.is_some() {
                info!("Loaded HTML template for {category} category");
            }

            if text.is_none() && html.is_none() {
                warn!("No template files found for {category} category, using built-in template");
                continue;
            }
            templates.insert(category, CategoryTemplate { text, html });
        }

        Self::from_templates(templates)
    }

    /// Pick the template for a category: styled, then plain, then built-in
    pub fn source(&self, category: Category) -> TemplateSource<'_> {
        let found = self.templates.get(&category);

        if let Some(html) = found.and_then(|t| t.html.as_deref()) {
            return TemplateSource::Html(html);
        }
        if let Some(text) = found.and_then(|t| t.text.as_deref()) {
            return TemplateSource::Text(text);
        }
        TemplateSource::Text(
            self.defaults
                .get(&category)
                .map(String::as_str)
                .unwrap_or_default(),
        )
    }

    /// Render the HTML body for a category
    pub fn render_html(
        &self,
        category: Category,
        values: &Placeholders<'_>,
    ) -> Result<String, TemplateError> {
        match self.source(category) {
            TemplateSource::Html(html) => render(html, values),
            TemplateSource::Text(text) => render(text, values).map(|t| text_to_html(&t)),
        }
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Could not read template {}: {e}, ignoring it", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn values() -> Placeholders<'static> {
        Placeholders {
            company_name: "Acme",
            poc_name: "Ada",
            event_name: "Equinox '26",
            sender_name: "Team",
            sender_email: "team@example.com",
        }
    }

    #[test]
    fn test_render_all_keys() {
        let out = render(
            "{poc_name} at {company_name}: {event_name} from {sender_name} <{sender_email}>",
            &values(),
        )
        .unwrap();
        assert_eq!(out, "Ada at Acme: Equinox '26 from Team <team@example.com>");
    }

    #[test]
    fn test_render_escaped_braces() {
        let out = render("p {{ margin: 0; }} {poc_name}", &values()).unwrap();
        assert_eq!(out, "p { margin: 0; } Ada");
    }

    #[test]
    fn test_render_unknown_placeholder() {
        let result = render("Hello {first_name}", &values());
        assert_eq!(
            result,
            Err(TemplateError::UnknownPlaceholder("first_name".to_string()))
        );
    }

    #[test]
    fn test_render_unterminated() {
        assert_eq!(
            render("Hello {poc_name", &values()),
            Err(TemplateError::Unterminated(6))
        );
    }

    #[test]
    fn test_render_unmatched_close() {
        assert_eq!(
            render("a {poc_name} b } c", &values()),
            Err(TemplateError::UnmatchedClose(15))
        );
    }

    #[test]
    fn test_render_passthrough_and_unicode() {
        let out = render("Grüße – {poc_name}!", &values()).unwrap();
        assert_eq!(out, "Grüße – Ada!");
    }

    #[test]
    fn test_text_to_html() {
        let html = text_to_html("Dear Ada,\n\nLine one\nLine two");
        assert!(html.contains("<p>Dear Ada,</p><p>Line one<br>Line two</p>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("font-family: Arial"));
    }

    #[test]
    fn test_default_templates_render() {
        for category in Category::ALL {
            let out = render(&default_template(category), &values()).unwrap();
            assert!(out.starts_with("Dear Ada,"));
            assert!(out.contains("valuable for Acme."));
            assert!(out.contains("Email: team@example.com"));
        }
        assert!(default_template(Category::Mechanical).contains("CAD"));
    }

    #[test]
    fn test_source_precedence() {
        let mut templates = HashMap::new();
        templates.insert(
            Category::Mechanical,
            CategoryTemplate {
                text: Some("plain".to_string()),
                html: Some("<b>styled</b>".to_string()),
            },
        );
        templates.insert(
            Category::Cs,
            CategoryTemplate {
                text: Some("plain".to_string()),
                html: None,
            },
        );
        let set = TemplateSet::from_templates(templates);

        assert_eq!(
            set.source(Category::Mechanical),
            TemplateSource::Html("<b>styled</b>")
        );
        assert_eq!(set.source(Category::Cs), TemplateSource::Text("plain"));
        assert!(matches!(
            set.source(Category::General),
            TemplateSource::Text(t) if t.contains("{company_name}")
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cs_template.txt"), "Hi {poc_name}").unwrap();
        fs::write(
            dir.path().join("mechanical_template.html"),
            "<p>{company_name}</p>",
        )
        .unwrap();

        let set = TemplateSet::load(dir.path());

        let cs = set.render_html(Category::Cs, &values()).unwrap();
        assert!(cs.contains("<p>Hi Ada</p>"));

        let mech = set.render_html(Category::Mechanical, &values()).unwrap();
        assert_eq!(mech, "<p>Acme</p>");

        let general = set.render_html(Category::General, &values()).unwrap();
        assert!(general.contains("Dear Ada,"));
    }

    #[test]
    fn test_load_missing_directory_uses_builtin() {
        let dir = tempdir().unwrap();
        let set = TemplateSet::load(&dir.path().join("nope"));
        assert!(matches!(set.source(Category::Cs), TemplateSource::Text(_)));
    }

    #[test]
    fn test_load_skips_unreadable_file_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cs_template.html"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("cs_template.txt"), "Hi {poc_name}").unwrap();
        fs::write(
            dir.path().join("mechanical_template.html"),
            "<p>{company_name}</p>",
        )
        .unwrap();

        let set = TemplateSet::load(dir.path());

        assert_eq!(set.source(Category::Cs), TemplateSource::Text("Hi {poc_name}"));
        assert_eq!(
            set.source(Category::Mechanical),
            TemplateSource::Html("<p>{company_name}</p>")
        );
    }

    #[test]
    fn test_text_to_html_crlf() {
        let html = text_to_html("Dear Ada,\r\n\r\nLine one\r\nLine two\r\n");
        assert!(html.contains("<p>Dear Ada,</p><p>Line one<br>Line two<br></p>"));
        assert!(!html.contains('\r'));
    }
}
