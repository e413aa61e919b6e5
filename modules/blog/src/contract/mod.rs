pub mod model;

pub use model::{
    Category, CategoryPatch, NewCategory, NewPost, NewUser, Post, PostPatch, PostView, User,
    UserPatch,
};
