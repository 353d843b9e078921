use crate::wl_opcode;

wl_opcode! {
    /// Requests understood by the `wl_display` singleton.
    DisplayRequest("wl_display") {
        /// Creates a synchronization point with the compositor.
        ///
        /// # Protocol XML
        /// ```xml
        /// <request name="sync">
        ///   <description summary="asynchronous roundtrip">
        ///     The sync request asks the server to emit the 'done' event
        ///     on the returned wl_callback object. Since requests are
        ///     handled in-order and events are delivered in-order, this can
        ///     be used as a barrier to ensure all previous requests and the
        ///     resulting events have been handled.
        ///   </description>
        ///   <arg name="callback" type="new_id" interface="wl_callback"/>
        /// </request>
        /// ```
        Sync = 0,

        /// Creates the global registry object.
        ///
        /// # Protocol XML
        /// ```xml
        /// <request name="get_registry">
        ///   <description summary="get global registry object">
        ///     This request creates a registry object that allows the client
        ///     to list and bind the global objects available from the
        ///     compositor.
        ///   </description>
        ///   <arg name="registry" type="new_id" interface="wl_registry"/>
        /// </request>
        /// ```
        GetRegistry = 1,
    }
}
