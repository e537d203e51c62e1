use serde_json::Value;

use super::Object;

/// The `Note` carried inside a `Create` activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Note<'a>(Object<'a>);

impl<'a> Note<'a> {
    /// The embedded `object` of an activity, if it is a `Note`.
    ///
    /// A bare IRI in `object` is not a note: nothing has been fetched yet and
    /// there is nothing to inspect.
    pub(crate) fn of(activity: &'a Object<'_>) -> Option<Note<'a>> {
        activity
            .get_node_object("object")
            .filter(|object| object.type_is("Note"))
            .map(Note)
    }
}

impl Note<'_> {
    pub(crate) fn content(&self) -> Option<&str> {
        self.0.get_str("content")
    }
    pub(crate) fn url(&self) -> Option<&str> {
        self.0.get_node_iri("url").or_else(|| self.0.id())
    }
    pub(crate) fn is_reply(&self) -> bool {
        self.0.has_value("inReplyTo")
    }
    /// The `tag` array. A single tag object that is not wrapped in an array
    /// is treated as no tags at all.
    pub(crate) fn tags(&self) -> Option<&[Value]> {
        self.0.get_array("tag").map(Vec::as_slice)
    }
    pub(crate) fn mention_count(&self) -> usize {
        self.tags()
            .map(|tags| tags.iter().filter(|tag| is_mention(tag)).count())
            .unwrap_or(0)
    }
    /// Copy of this note with every `Mention` removed from `tag`. Other tags
    /// keep their relative order.
    pub(crate) fn without_mentions(&self) -> Note<'static> {
        let Some(tags) = self.tags() else {
            return Note(self.0.clone().into_owned());
        };
        let kept = tags.iter().filter(|tag| !is_mention(tag)).cloned().collect();
        Note(self.0.clone().replace("tag", Value::Array(kept)))
    }
    /// Copy of `activity` with its `object` swapped for this note.
    pub(crate) fn into_activity(self, activity: &Object<'_>) -> Object<'static> {
        activity.clone().replace("object", self.0.into())
    }
}

fn is_mention(tag: &Value) -> bool {
    Object::from(tag).type_is("Mention")
}
