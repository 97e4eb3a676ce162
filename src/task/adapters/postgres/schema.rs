//! Diesel schema for task board persistence.

diesel::table! {
    /// Task records with their dense column positions.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task title.
        #[max_length = 200]
        title -> Varchar,
        /// Optional description.
        description -> Nullable<Text>,
        /// Column label.
        #[max_length = 100]
        column_name -> Varchar,
        /// Zero-based rank inside (`project_id`, `column_name`).
        position -> Int4,
        /// Optional assignee.
        assignee_id -> Nullable<Uuid>,
        /// Reporter.
        reporter_id -> Uuid,
        /// Priority label.
        #[max_length = 20]
        priority -> Varchar,
        /// Ordered subtask checklist.
        subtasks -> Jsonb,
        /// Sorted label set.
        labels -> Jsonb,
        /// Activity log in append order.
        activity_log -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Users allowed to work on a project board.
    project_members (project_id, user_id) {
        /// Project identifier.
        project_id -> Uuid,
        /// Member identifier.
        user_id -> Uuid,
    }
}
