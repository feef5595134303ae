use crate::error::{OrmError, OrmResult};
use crate::item::{ItemMut, TaggedMap};
use crate::keys::PrimaryKeyDescriptor;
use crate::value::Value;

/// Result of writing a generated key back into an item.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The item itself now carries the key.
    Applied,
    /// The item could not be modified; this fresh copy carries the key.
    Converted(TaggedMap),
    /// The item could not be modified and no copy was requested.
    NotApplied,
}

impl UpsertOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Write the generated key `pk` into `item`.
///
/// Tagged maps get the key inserted (or replaced). Records get their key
/// member set, when the descriptor is bound to one. Anything else is copied
/// into a new tagged map if `create_if_needed`, which is only worth doing for
/// the first item of a batch.
pub fn upsert_item_pk(
    item: ItemMut<'_>,
    keys: &PrimaryKeyDescriptor,
    pk: Value,
    create_if_needed: bool,
) -> OrmResult<UpsertOutcome> {
    let [key] = keys.keys() else {
        return Err(OrmError::configuration(format!(
            "Cannot write a generated key back with {} primary key(s)",
            keys.count()
        )));
    };

    match item {
        ItemMut::Map(map) => {
            map.insert(key.as_str(), pk);
            Ok(UpsertOutcome::Applied)
        }
        ItemMut::Record(record) if keys.key_member().is_some() => {
            if record.set_field(key, pk.clone())? {
                Ok(UpsertOutcome::Applied)
            } else {
                convert(ItemMut::Record(record), key, pk, create_if_needed)
            }
        }
        other => convert(other, key, pk, create_if_needed),
    }
}

fn convert(
    item: ItemMut<'_>,
    key: &str,
    pk: Value,
    create_if_needed: bool,
) -> OrmResult<UpsertOutcome> {
    if !create_if_needed {
        return Ok(UpsertOutcome::NotApplied);
    }
    // A value-only item is just the key itself.
    let mut copy = match &item {
        ItemMut::Values(_) => TaggedMap::new(),
        other => other.as_item().to_map(),
    };
    copy.insert(key, pk);
    Ok(UpsertOutcome::Converted(copy))
}
