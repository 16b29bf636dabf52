pub mod shared {
    pub mod infrastructure {
        pub mod change_feed;
        pub mod lazy_resource;
    }
}

pub mod modules {
    pub mod pledges {
        pub mod core {
            pub mod changes;
            pub mod errors;
            pub mod pledge;
            pub mod ports;
            pub mod stats;
        }
        pub mod use_cases {
            pub mod track_pledges {
                pub mod handler;
                pub mod store;
            }
            pub mod summarize_pledges {
                pub mod handler;
            }
            pub mod submit_pledge {
                pub mod celebration;
                pub mod command;
                pub mod controller;
                pub mod decide;
                pub mod decision;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod in_memory;
                pub mod local_file;
            }
        }
    }
}

pub mod shell;
