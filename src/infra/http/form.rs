//! Multipart form payloads.

use bytes::Bytes;

/// One part of a [`FormData`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        data: Bytes,
    },
}

/// Ordered multipart fields. Repeated names are kept, as browsers do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    fields: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), FormValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.fields.push((
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.map(str::to_string),
                data: data.into(),
            },
        ));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the `reqwest` form. Fails on a malformed content type.
    pub(crate) fn to_multipart(&self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = match value {
                FormValue::Text(text) => form.text(name.clone(), text.clone()),
                FormValue::File {
                    file_name,
                    content_type,
                    data,
                } => {
                    let mut part =
                        reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.clone());
                    if let Some(content_type) = content_type {
                        part = part.mime_str(content_type)?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_insertion_order_and_duplicates() {
        let form = FormData::new()
            .text("tag", "a")
            .file("cv", "cv.pdf", Some("application/pdf"), &b"%PDF"[..])
            .text("tag", "b");
        let names: Vec<&str> = form.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["tag", "cv", "tag"]);
        assert!(form.to_multipart().is_ok());
    }

    #[test]
    fn malformed_content_type_is_rejected() {
        let form = FormData::new().file("cv", "cv.pdf", Some("not a mime"), Bytes::new());
        assert!(form.to_multipart().is_err());
    }
}
