use serde::Serialize;
use tera::{Context, Tera};

use crate::error::MailError;

const LAYOUT: &str = include_str!("../templates/layout.html");
const CANCELLATION_PT_BR: &str = include_str!("../templates/cancellation.pt_BR.html");
const CANCELLATION_EN_US: &str = include_str!("../templates/cancellation.en_US.html");

/// Renders the bundled HTML mail templates.
///
/// Templates are looked up as `{name}.{locale}.html`; a missing locale falls
/// back to `pt_BR`.
pub struct MailRenderer {
    tera: Tera,
}

impl MailRenderer {
    pub fn new() -> Result<Self, MailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", LAYOUT),
            ("cancellation.pt_BR.html", CANCELLATION_PT_BR),
            ("cancellation.en_US.html", CANCELLATION_EN_US),
        ])?;
        Ok(Self { tera })
    }

    pub fn render<C: Serialize>(&self, template: &str, locale: &str, context: &C) -> Result<String, MailError> {
        let context = Context::from_serialize(context)?;

        let localized = format!("{}.{}.html", template, locale);
        let name = if self.has_template(&localized) {
            localized
        } else {
            format!("{}.pt_BR.html", template)
        };

        Ok(self.tera.render(&name, &context)?)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}
