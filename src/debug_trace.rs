macro_rules! trace {
    ( @mode $mode:expr ) => {
        #[cfg(feature = "debug_trace")]
        println!("@mode: {}", $mode);
    };

    ( @token $token:expr ) => {
        #[cfg(feature = "debug_trace")]
        println!("@token: {:?}", $token);
    };

    ( @suspend $reason:expr ) => {
        #[cfg(feature = "debug_trace")]
        println!("@suspend: {}", $reason);
    };
}
