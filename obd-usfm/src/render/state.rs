//! Open-block bookkeeping for one conversion.
//!
//! Every `close_*` helper is a no-op when nothing of its kind is open and
//! reports whether it closed anything, so callers can decide how loudly to
//! complain about it.
use crate::markers::Container;

#[derive(Debug, Default)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "One flag per kind of open block"
)]
pub(super) struct RenderState {
  pub html:          String,
  pub chapter:       Option<u32>,
  pub container:     Option<Container>,
  /// Tag of the open paragraph.
  pub paragraph:     Option<String>,
  pub section:       bool,
  /// One entry per open `<ul>`, true while that level has an open `<li>`.
  pub lists:         Vec<bool>,
  pub table:         bool,
  pub table_row:     bool,
  pub speaker:       bool,
  pub right_box:     bool,
  /// The last thing emitted in basic mode was a heading.
  pub after_heading: bool,
  basic_only:        bool,
}

impl RenderState {
  pub fn new(basic_only: bool, chapter: Option<u32>) -> Self {
    Self {
      chapter,
      basic_only,
      ..Self::default()
    }
  }

  pub fn push(&mut self, html: &str) {
    self.html.push_str(html);
  }

  /// Pushes block markup, which basic mode leaves out.
  pub fn push_structure(&mut self, html: &str) {
    if !self.basic_only {
      self.html.push_str(html);
    }
  }

  pub fn close_right_box(&mut self) -> bool {
    if !self.right_box {
      return false;
    }
    self.right_box = false;
    self.push_structure("</div><!--rightBox-->\n");
    true
  }

  pub fn close_paragraph(&mut self) -> bool {
    if self.paragraph.take().is_none() {
      return false;
    }
    self.push_structure("</p>\n");
    true
  }

  pub fn close_speaker(&mut self) -> bool {
    if !self.speaker {
      return false;
    }
    self.speaker = false;
    self.push_structure("</div><!--sp-->\n");
    true
  }

  /// Closes an `s1` division together with anything still open inside it.
  pub fn close_section(&mut self) -> bool {
    if !self.section {
      return false;
    }
    self.close_right_box();
    self.close_speaker();
    self.section = false;
    self.push_structure("</div><!--s1-->\n");
    true
  }

  pub fn close_container(&mut self) -> Option<Container> {
    let container = self.container.take()?;
    self.push_structure(&format!("</div><!--{}-->\n", container.class()));
    Some(container)
  }

  pub fn open_list(&mut self) {
    self.push_structure("<ul>\n");
    self.lists.push(false);
  }

  pub fn close_list_item(&mut self) -> bool {
    match self.lists.last_mut() {
      Some(open @ true) => {
        *open = false;
        self.push_structure("</li>\n");
        true
      },
      _ => false,
    }
  }

  fn close_list_level(&mut self) {
    self.close_list_item();
    if self.lists.pop().is_some() {
      self.push_structure("</ul>\n");
    }
  }

  /// Closes list levels until only `depth` remain.
  pub fn close_lists_to(&mut self, depth: usize) {
    while self.lists.len() > depth {
      self.close_list_level();
    }
  }

  pub fn close_lists(&mut self) -> bool {
    let had_lists = !self.lists.is_empty();
    self.close_lists_to(0);
    had_lists
  }

  /// Starts a table row, opening the table first if needed.
  pub fn open_row(&mut self) {
    if !self.table {
      self.push("<table>\n");
      self.table = true;
    }
    self.close_row();
    self.push("<tr>");
    self.table_row = true;
  }

  fn close_row(&mut self) {
    if self.table_row {
      self.table_row = false;
      self.push("</tr>\n");
    }
  }

  pub fn close_table(&mut self) -> bool {
    if !self.table {
      return false;
    }
    self.close_row();
    self.table = false;
    self.push("</table>\n");
    true
  }
}
