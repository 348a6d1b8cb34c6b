use handlebars::{Handlebars, RenderError, TemplateError};
use serde_json::json;

use crate::table::StudentRecord;

/// Link appended to every result page
pub const BACK_LINK: &str = "<br><a href='/'>返回查詢</a>";

/// Page for a student ID that is not in the class sheet
pub const STUDENT_NOT_FOUND_PAGE: &str =
    "<h2>❌ 查無此學生，請確認輸入是否正確！</h2><br><a href='/'>返回查詢</a>";

/// Page for a password that does not match the sheet
pub const WRONG_PASSWORD_PAGE: &str = "<h2>❌ 密碼錯誤，請重新輸入！</h2><br><a href='/'>返回查詢</a>";

const DOWNLOAD_FAILED_TEMPLATE: &str =
    "<h2>❌ 無法下載 {{class_id}} 班的成績，請確認班級代碼是否正確！</h2><br><a href='/'>返回查詢</a>";

const REPORT_TEMPLATE: &str = "<h2>📖 {{name}} ({{student_id}}) 的成績</h2>\
<table border=\"1\" class=\"dataframe\">
  <thead>
    <tr style=\"text-align: right;\">
{{#each scores}}      <th>{{this.column}}</th>
{{/each}}    </tr>
  </thead>
  <tbody>
    <tr>
{{#each scores}}      <td>{{this.value}}</td>
{{/each}}    </tr>
  </tbody>
</table><br><a href='/'>返回查詢</a>";

/// HTML pages returned by the query endpoint
///
/// Values are substituted through handlebars, so markup in class codes,
/// names, headers and scores is HTML-escaped.
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string("report", REPORT_TEMPLATE)?;
        registry.register_template_string("download_failed", DOWNLOAD_FAILED_TEMPLATE)?;
        Ok(Self { registry })
    }

    /// The score table for a verified student
    pub fn report(&self, record: &StudentRecord) -> Result<String, RenderError> {
        let scores: Vec<_> = record
            .scores
            .iter()
            .map(|cell| json!({ "column": cell.column, "value": cell.value }))
            .collect();

        self.registry.render(
            "report",
            &json!({
                "name": record.name,
                "student_id": record.student_id,
                "scores": scores,
            }),
        )
    }

    pub fn download_failed(&self, class_id: &str) -> Result<String, RenderError> {
        self.registry
            .render("download_failed", &json!({ "class_id": class_id }))
    }

    pub fn student_not_found(&self) -> &'static str {
        STUDENT_NOT_FOUND_PAGE
    }

    pub fn wrong_password(&self) -> &'static str {
        WRONG_PASSWORD_PAGE
    }
}
