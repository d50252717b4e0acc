use sea_orm::ColumnTrait;
use sea_query::OnConflict;

/// Declarative conflict handling for inserts.
///
/// On a conflict over `conflict_columns` the listed `update_columns` are
/// overwritten with the incoming values. No update columns means the
/// existing row is left as it is.
#[derive(Debug, Clone)]
pub struct UpsertConfig<C> {
    pub conflict_columns: Vec<C>,
    pub update_columns: Vec<C>,
}

impl<C: ColumnTrait> UpsertConfig<C> {
    pub fn overwrite(conflict_columns: Vec<C>, update_columns: Vec<C>) -> Self {
        Self {
            conflict_columns,
            update_columns,
        }
    }

    pub fn ignore(conflict_columns: Vec<C>) -> Self {
        Self {
            conflict_columns,
            update_columns: Vec::new(),
        }
    }

    pub fn on_conflict(&self) -> OnConflict {
        let mut on_conflict = OnConflict::columns(self.conflict_columns.iter().copied());

        if self.update_columns.is_empty() {
            // MySQL has no DO NOTHING; rewrite the key onto itself instead
            on_conflict.update_columns(self.conflict_columns.iter().copied());
        } else {
            on_conflict.update_columns(self.update_columns.iter().copied());
        }

        on_conflict
    }
}
